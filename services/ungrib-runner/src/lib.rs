//! Runs WPS ungrib over ERA5 data one month at a time.
//!
//! For every month in the configured range the runner replaces the
//! `GRIBFILE.*` links in the WPS directory, points `namelist.wps` at the
//! month, submits the ungrib batch job and waits until the month's
//! intermediate files are all present.

pub mod config;
pub mod driver;
pub mod error;
pub mod links;
pub mod poller;
pub mod submit;

pub use config::{ConfigFile, RunConfig};
pub use driver::{DriverState, MonthlyDriver, RunSummary};
pub use error::{ConfigError, Result, RunnerError};
pub use links::{CleanupReport, LinkManager};
pub use poller::{CompletionPoller, PollPolicy, Sleeper, TokioSleeper, WaitOutcome};
pub use submit::{JobSubmitter, Submission};
