//! Command runner — execute install commands.
//!
//! Supports command allowlisting, workspace scoping, and timeout. Failures
//! are captured in the returned [`CommandOutcome`], never raised.

use autoforge_core::record::CommandOutcome;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code recorded when the process never produced one.
const NO_EXIT_CODE: i32 = -1;

/// Execute shell commands with safety constraints.
pub struct CommandRunner {
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new(allowed_commands: Vec<String>, timeout: Duration) -> Self {
        Self {
            allowed_commands,
            timeout,
            working_dir: None,
        }
    }

    /// Run every command from `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true; // No allowlist = all commands allowed
        }

        // Extract the base command (first word)
        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();

        self.allowed_commands.iter().any(|a| a == base_cmd)
    }

    fn refused(command: &str, reason: String) -> CommandOutcome {
        CommandOutcome {
            command: command.to_string(),
            exit_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr: reason,
        }
    }

    /// Run `command` through the platform shell.
    pub async fn run(&self, command: &str) -> CommandOutcome {
        if !self.is_command_allowed(command) {
            let base = command.split_whitespace().next().unwrap_or("");
            warn!(command = %command, "Command refused by allowlist");
            return Self::refused(command, format!("Command '{base}' not in allowlist"));
        }

        debug!(command = %command, "Executing install command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(NO_EXIT_CODE);
                if exit_code != 0 {
                    warn!(command = %command, exit_code, "Command failed");
                }
                CommandOutcome {
                    command: command.to_string(),
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
                }
            }
            Ok(Err(e)) => {
                warn!(command = %command, error = %e, "Command could not be started");
                Self::refused(command, format!("Failed to start command: {e}"))
            }
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Command timed out");
                Self::refused(
                    command,
                    format!("Command timed out after {}s", self.timeout.as_secs_f64()),
                )
            }
        }
    }
}
