//! Experiment trackers.

use async_trait::async_trait;
use bsort_abstraction::{ExperimentTracker, TrackerError};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Tracker backed by the Weights & Biases `wandb` CLI.
///
/// `login` relies on `WANDB_API_KEY` or an existing netrc entry; stdin is closed so the CLI
/// never blocks on an interactive prompt.
#[derive(Debug, Clone)]
pub struct WandbTracker {
    binary: String,
}

impl WandbTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { binary: "wandb".to_string() }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<(), TrackerError> {
        debug!(binary = %self.binary, args = ?args, "Running wandb command");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TrackerError::BinaryNotFound(self.binary.clone())
                } else {
                    TrackerError::from(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrackerError::CommandFailed(format!(
                "{} {}: {}",
                self.binary,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Default for WandbTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExperimentTracker for WandbTracker {
    fn id(&self) -> &'static str {
        "wandb"
    }

    async fn login(&self) -> Result<(), TrackerError> {
        self.run(&["login"]).await
    }

    async fn init(&self, project: &str) -> Result<(), TrackerError> {
        self.run(&["init", "--project", project]).await
    }
}

/// Tracker that does nothing. Used when tracking is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

#[async_trait]
impl ExperimentTracker for NoopTracker {
    fn id(&self) -> &'static str {
        "none"
    }

    async fn login(&self) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn init(&self, project: &str) -> Result<(), TrackerError> {
        debug!(project = %project, "Tracking disabled, skipping init");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_wandb_binary() {
        let tracker = WandbTracker::new().with_binary("nonexistent_binary_xyz123");
        let err = tracker.login().await.unwrap_err();
        assert_eq!(err, TrackerError::BinaryNotFound("nonexistent_binary_xyz123".to_string()));
    }

    #[tokio::test]
    async fn test_failing_command_reports_args() {
        #[cfg(unix)]
        {
            let tracker = WandbTracker::new().with_binary("false");
            let err = tracker.init("caps").await.unwrap_err();
            match err {
                TrackerError::CommandFailed(msg) => assert!(msg.contains("init --project caps")),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_noop_tracker() {
        assert!(NoopTracker.login().await.is_ok());
        assert!(NoopTracker.init("caps").await.is_ok());
    }
}
