//! Git-backed version control for deployed files.

use async_trait::async_trait;
use autoforge_core::error::VcsError;
use autoforge_core::vcs::VersionControl;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GitVersionControl {
    repo: PathBuf,
    author_name: String,
    author_email: String,
    timeout: Duration,
}

impl GitVersionControl {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            author_name: "autoforge".into(),
            author_email: "autoforge@localhost".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound on each git invocation, hooks included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output, VcsError> {
        let command = format!("git {}", args.join(" "));
        let child = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(VcsError::CommandFailed {
                command,
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Git command timed out");
                Err(VcsError::TimedOut {
                    command,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.repo).unwrap_or(path)
    }
}

#[async_trait]
impl VersionControl for GitVersionControl {
    fn name(&self) -> &str {
        "git"
    }

    async fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<bool, VcsError> {
        if paths.is_empty() {
            return Ok(false);
        }

        let probe = self.git(&["rev-parse", "--is-inside-work-tree"]).await?;
        if !probe.status.success() {
            return Err(VcsError::NotARepository(self.repo.display().to_string()));
        }

        let relative: Vec<String> = paths
            .iter()
            .map(|p| self.relative(p).to_string_lossy().into_owned())
            .collect();
        let mut add_args = vec!["add", "--"];
        add_args.extend(relative.iter().map(String::as_str));

        let add = self.git(&add_args).await?;
        if !add.status.success() {
            return Err(VcsError::CommandFailed {
                command: "git add".into(),
                reason: String::from_utf8_lossy(&add.stderr).trim().to_string(),
            });
        }

        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        let commit = self
            .git(&["-c", &name, "-c", &email, "commit", "-m", message])
            .await?;

        if commit.status.success() {
            info!(files = paths.len(), "Committed deployed files");
            return Ok(true);
        }

        let stdout = String::from_utf8_lossy(&commit.stdout);
        if stdout.contains("nothing to commit") || stdout.contains("nothing added to commit") {
            debug!("Nothing to commit");
            return Ok(false);
        }

        Err(VcsError::CommandFailed {
            command: "git commit".into(),
            reason: String::from_utf8_lossy(&commit.stderr).trim().to_string(),
        })
    }
}
