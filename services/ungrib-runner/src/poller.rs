//! Completion polling for ungrib output.
//!
//! The batch job is never observed directly. A month counts as done when
//! the output directory holds exactly the expected number of intermediate
//! files for the month's last day. Fewer means ungrib is still running;
//! more usually means leftovers from an earlier run, and is not accepted
//! either.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wps_common::{matching_files, FilePattern, YearMonth};

use crate::config::RunConfig;
use crate::error::{Result, RunnerError};

/// 30 minutes between output checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1800;

/// 3-hourly ERA5 analyses give eight files per day.
pub const DEFAULT_EXPECTED_FILES: usize = 8;

/// Suspends the driver between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often to poll and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub expected_files: usize,
    /// `None` waits indefinitely
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            expected_files: DEFAULT_EXPECTED_FILES,
            max_wait: None,
        }
    }
}

/// Result of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Number of directory checks, including the successful one
    pub attempts: u32,
    /// Total time spent sleeping
    pub waited: Duration,
}

/// Watches the output directory for a month's intermediate files.
#[derive(Debug, Clone)]
pub struct CompletionPoller {
    output_dir: PathBuf,
    output_prefix: String,
    policy: PollPolicy,
}

impl CompletionPoller {
    pub fn new(output_dir: impl Into<PathBuf>, output_prefix: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_prefix: output_prefix.into(),
            policy,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.output_dir, &config.output_prefix, config.poll)
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// `ERA5:<last day of month>*`
    pub fn last_day_pattern(&self, month: YearMonth) -> String {
        format!(
            "{}:{}*",
            self.output_prefix,
            month.last_day().format("%Y-%m-%d")
        )
    }

    /// Number of output files for the last day of `month`.
    pub fn count_outputs(&self, month: YearMonth) -> Result<usize> {
        let raw = self.last_day_pattern(month);
        let pattern = FilePattern::new(&raw).map_err(|source| RunnerError::Pattern {
            pattern: raw.clone(),
            source,
        })?;

        let files = matching_files(&self.output_dir, &pattern).map_err(|source| RunnerError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        Ok(files.len())
    }

    /// True iff exactly `expected_files` outputs exist for the month's last day.
    pub fn is_complete(&self, month: YearMonth) -> Result<bool> {
        let found = self.count_outputs(month)?;
        Ok(self.check(month, found))
    }

    fn check(&self, month: YearMonth, found: usize) -> bool {
        let expected = self.policy.expected_files;

        if found > expected {
            warn!(
                month = %month,
                found = found,
                expected = expected,
                "More output files than expected, treating month as incomplete"
            );
        }

        debug!(month = %month, found = found, expected = expected, "Checked output files");
        found == expected
    }

    /// Poll until the month is complete, sleeping `interval` between checks.
    ///
    /// Fails with `TimeoutExceeded` once another sleep would take the total
    /// wait past `max_wait`.
    pub async fn wait_until_complete(&self, month: YearMonth, sleeper: &dyn Sleeper) -> Result<WaitOutcome> {
        let interval = self.policy.interval;
        let expected = self.policy.expected_files;
        let mut attempts = 0u32;
        let mut waited = Duration::ZERO;

        loop {
            attempts += 1;
            let found = self.count_outputs(month)?;

            if self.check(month, found) {
                info!(
                    month = %month,
                    attempts = attempts,
                    waited_secs = waited.as_secs(),
                    "Output files complete"
                );
                return Ok(WaitOutcome { attempts, waited });
            }

            if let Some(max_wait) = self.policy.max_wait {
                if waited + interval > max_wait {
                    return Err(RunnerError::TimeoutExceeded {
                        month,
                        waited,
                        found,
                        expected,
                    });
                }
            }

            info!(
                month = %month,
                found = found,
                expected = expected,
                retry_in_secs = interval.as_secs(),
                "Waiting for output files"
            );
            sleeper.sleep(interval).await;
            waited += interval;
        }
    }
}
