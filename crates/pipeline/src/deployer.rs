//! Deployer — applies an approved [`CodeBundle`] to the workspace.
//!
//! Every step is attempted and recorded: a file that cannot be written does
//! not stop the others, a failing install command does not stop later ones,
//! and a version-control failure is logged only.

use autoforge_core::record::{
    CodeBundle, CommitOutcome, DeploymentResult, DeploymentStatus, FeatureRequest, WriteFailure,
};
use autoforge_core::vcs::VersionControl;
use autoforge_tools::{CommandRunner, WorkspaceWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of the request kept in the commit message.
const COMMIT_SUBJECT_CHARS: usize = 72;

pub struct Deployer {
    writer: WorkspaceWriter,
    runner: CommandRunner,
    vcs: Option<Arc<dyn VersionControl>>,
}

impl Deployer {
    /// Deploy under `writer`'s root, running commands from that root.
    pub fn new(writer: WorkspaceWriter, runner: CommandRunner) -> Self {
        let root = writer.root().to_path_buf();
        Self {
            writer,
            runner: runner.in_dir(root),
            vcs: None,
        }
    }

    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub async fn deploy(&self, request: &FeatureRequest, code: &CodeBundle) -> DeploymentResult {
        if let Err(e) = tokio::fs::create_dir_all(self.writer.root()).await {
            warn!(root = %self.writer.root().display(), error = %e, "Could not create workspace root");
        }

        let mut files_written = Vec::new();
        let mut written_paths: Vec<PathBuf> = Vec::new();
        let mut write_failures = Vec::new();
        for (path, content) in &code.files {
            match self.writer.write(path, content).await {
                Ok(target) => {
                    files_written.push(path.clone());
                    written_paths.push(target);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "File write failed");
                    write_failures.push(WriteFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut commands = Vec::with_capacity(code.install_commands.len());
        for command in &code.install_commands {
            commands.push(self.runner.run(command).await);
        }

        let commit = self.commit(request, &written_paths).await;

        let failed = !write_failures.is_empty() || commands.iter().any(|c| !c.succeeded());
        let status = if failed {
            DeploymentStatus::Failed
        } else {
            DeploymentStatus::Success
        };

        info!(
            files = files_written.len(),
            write_failures = write_failures.len(),
            commands = commands.len(),
            ?status,
            "Deployment finished"
        );

        DeploymentResult {
            files_written,
            write_failures,
            commands,
            commit,
            status,
        }
    }

    async fn commit(&self, request: &FeatureRequest, paths: &[PathBuf]) -> CommitOutcome {
        let Some(vcs) = &self.vcs else {
            return CommitOutcome::Disabled;
        };
        if paths.is_empty() {
            return CommitOutcome::NotCommitted;
        }

        let subject: String = request.text.chars().take(COMMIT_SUBJECT_CHARS).collect();
        let message = format!("Auto-construct: {subject}");
        match vcs.commit_files(paths, &message).await {
            Ok(true) => CommitOutcome::Committed,
            Ok(false) => CommitOutcome::NotCommitted,
            Err(e) => {
                warn!(vcs = %vcs.name(), error = %e, "Commit failed");
                CommitOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
