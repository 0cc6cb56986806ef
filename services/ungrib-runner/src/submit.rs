//! Batch job submission.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::{Result, RunnerError};

/// An accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Scheduler's stdout, trimmed. Empty when the scheduler prints nothing.
    pub job_id: String,
}

/// Hands the ungrib job script to the batch scheduler.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    command: String,
    script: PathBuf,
    work_dir: PathBuf,
}

impl JobSubmitter {
    pub fn new(command: impl Into<String>, script: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            script: script.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.submit_command, &config.batch_script, &config.base_dir)
    }

    /// Run `<command> <script>` and capture the scheduler's answer.
    pub async fn submit(&self) -> Result<Submission> {
        debug!(
            command = %self.command,
            script = %self.script.display(),
            "Submitting batch job"
        );

        let output = Command::new(&self.command)
            .arg(&self.script)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|e| RunnerError::SubmitFailure {
                reason: format!("failed to run {}: {}", self.command, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunnerError::SubmitFailure {
                reason: format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            });
        }

        let job_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(job_id = %job_id, "Job submitted");
        Ok(Submission { job_id })
    }
}
