//! Month-by-month driver.
//!
//! Each month goes through the same fixed sequence:
//!
//! ```text
//! Cleaning -> Linking -> Configuring -> Submitting -> Waiting -> Advancing
//! ```
//!
//! and the next month starts only after the previous one's output is
//! complete. The first error ends the run; the driver stays in the state
//! where it failed and nothing done for the failing month is undone.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};
use wps_common::{MonthRange, Namelist, YearMonth};

use crate::config::RunConfig;
use crate::error::Result;
use crate::links::LinkManager;
use crate::poller::{CompletionPoller, Sleeper};
use crate::submit::JobSubmitter;

/// Where the driver is in the monthly sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Cleaning,
    Linking,
    Configuring,
    Submitting,
    Waiting,
    Advancing,
    Done,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Idle => "idle",
            DriverState::Cleaning => "cleaning",
            DriverState::Linking => "linking",
            DriverState::Configuring => "configuring",
            DriverState::Submitting => "submitting",
            DriverState::Waiting => "waiting",
            DriverState::Advancing => "advancing",
            DriverState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Months that went through ungrib
    pub processed: usize,
    /// Months skipped because their output was already complete
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Drives ungrib over a range of months, one at a time.
pub struct MonthlyDriver {
    range: MonthRange,
    skip_complete: bool,
    links: LinkManager,
    namelist: Namelist,
    submitter: JobSubmitter,
    poller: CompletionPoller,
    sleeper: Arc<dyn Sleeper>,
    state: DriverState,
    current: Option<YearMonth>,
}

impl MonthlyDriver {
    pub fn new(config: &RunConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            range: config.range,
            skip_complete: config.skip_complete,
            links: LinkManager::from_config(config),
            namelist: Namelist::new(&config.namelist_path),
            submitter: JobSubmitter::from_config(config),
            poller: CompletionPoller::from_config(config),
            sleeper,
            state: DriverState::Idle,
            current: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Month being processed, or the last one touched once the run ends.
    pub fn current(&self) -> Option<YearMonth> {
        self.current
    }

    /// Process every month in the range.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut processed = 0;
        let mut skipped = 0;

        info!(range = %self.range, months = self.range.len(), "Starting ungrib run");

        for month in self.range.iter() {
            self.current = Some(month);

            if self.skip_complete && self.poller.is_complete(month)? {
                info!(month = %month, "Output already complete, skipping month");
                skipped += 1;
                self.transition(DriverState::Advancing, month);
                continue;
            }

            self.process_month(month).await?;
            processed += 1;
        }

        self.state = DriverState::Done;
        let summary = RunSummary {
            processed,
            skipped,
            elapsed: started.elapsed(),
        };

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            elapsed_secs = summary.elapsed.as_secs(),
            "All months processed"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(month = %month))]
    async fn process_month(&mut self, month: YearMonth) -> Result<()> {
        info!("Processing month");

        self.transition(DriverState::Cleaning, month);
        self.links.cleanup();

        self.transition(DriverState::Linking, month);
        self.links.link(month).await?;

        self.transition(DriverState::Configuring, month);
        let window = self.namelist.update(month)?;
        debug!(
            start = %window.start_string(),
            end = %window.end_string(),
            "Namelist dates set"
        );

        self.transition(DriverState::Submitting, month);
        let submission = self.submitter.submit().await?;

        self.transition(DriverState::Waiting, month);
        let outcome = self
            .poller
            .wait_until_complete(month, self.sleeper.as_ref())
            .await?;

        self.transition(DriverState::Advancing, month);
        info!(
            job_id = %submission.job_id,
            attempts = outcome.attempts,
            waited_secs = outcome.waited.as_secs(),
            "Month complete"
        );
        Ok(())
    }

    fn transition(&mut self, next: DriverState, month: YearMonth) {
        debug!(month = %month, from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}
