//! OS command execution
//!
//! Every integration with OS tooling (systemctl, supervisorctl, nmcli,
//! timedatectl, chronyc, ...) goes through [`CommandRunner`], so services can
//! be exercised against a recording runner in tests.

use async_trait::async_trait;
use std::fmt;
use tokio::process::Command;
use tracing::debug;

/// Failed command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// Rendered command line
    pub command: String,
    /// Exit status, `None` when the process could not be spawned or was killed
    pub status: Option<i32>,
    /// Captured stderr (or the spawn error)
    pub stderr: String,
}

impl CommandError {
    pub fn new(command: impl Into<String>, status: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status,
            stderr: stderr.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(
                f,
                "`{}` exited with status {}: {}",
                self.command, code, self.stderr
            ),
            None => write!(f, "`{}` failed: {}", self.command, self.stderr),
        }
    }
}

impl std::error::Error for CommandError {}

/// Run OS programs and collect their stdout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` and return trimmed stdout
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError>;

    /// Same as [`run`](Self::run) with elevated privileges
    async fn run_privileged(&self, program: &str, args: &[&str]) -> Result<String, CommandError>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

impl SystemCommandRunner {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        let rendered = render(program, args);
        debug!("Running command: {}", rendered);

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandError::new(&rendered, None, e.to_string()))?;

        if !output.status.success() {
            return Err(CommandError::new(
                rendered,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        self.execute(program, args).await
    }

    async fn run_privileged(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        self.execute("sudo", &full).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        let out = SystemCommandRunner.run("echo", &["  hello  "]).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_status() {
        let err = SystemCommandRunner
            .run("sh", &["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(3));
        assert_eq!(err.stderr, "boom");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = SystemCommandRunner
            .run("gnode-definitely-missing-binary", &[])
            .await
            .unwrap_err();
        assert_eq!(err.status, None);
    }
}
