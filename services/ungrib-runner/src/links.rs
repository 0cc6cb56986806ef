//! GRIB link management in the WPS working directory.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};
use wps_common::{matching_files, FilePattern, YearMonth};

use crate::config::RunConfig;
use crate::error::{Result, RunnerError};

/// Links created by the link script.
pub const GRIB_LINK_PATTERN: &str = "GRIBFILE.*";

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// Removes stale `GRIBFILE.*` links and creates a fresh set for a month.
#[derive(Debug, Clone)]
pub struct LinkManager {
    work_dir: PathBuf,
    grib_dir: PathBuf,
    script: PathBuf,
    interpreter: String,
    source_prefix: String,
}

impl LinkManager {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        grib_dir: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
        interpreter: impl Into<String>,
        source_prefix: impl Into<String>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            grib_dir: grib_dir.into(),
            script: script.into(),
            interpreter: interpreter.into(),
            source_prefix: source_prefix.into(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            &config.base_dir,
            &config.grib_dir,
            &config.link_script,
            &config.link_interpreter,
            &config.source_prefix,
        )
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// File-name pattern for a month's source files, e.g. `e5*202012*`.
    pub fn source_pattern(&self, month: YearMonth) -> String {
        format!("{}*{}*", self.source_prefix, month.compact())
    }

    /// Full glob as it would be written on a command line.
    pub fn source_glob(&self, month: YearMonth) -> PathBuf {
        self.grib_dir.join(self.source_pattern(month))
    }

    /// Source files for `month`, sorted.
    pub fn source_files(&self, month: YearMonth) -> Result<Vec<PathBuf>> {
        let raw = self.source_pattern(month);
        let pattern = FilePattern::new(&raw).map_err(|source| RunnerError::Pattern {
            pattern: raw.clone(),
            source,
        })?;

        matching_files(&self.grib_dir, &pattern).map_err(|source| RunnerError::Io {
            path: self.grib_dir.clone(),
            source,
        })
    }

    /// Delete every `GRIBFILE.*` entry in the working directory.
    ///
    /// Never fails: entries that cannot be removed are logged and counted.
    pub fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        let pattern = match FilePattern::new(GRIB_LINK_PATTERN) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Invalid GRIB link pattern");
                return report;
            }
        };

        let links = match matching_files(&self.work_dir, &pattern) {
            Ok(links) => links,
            Err(e) => {
                warn!(
                    dir = %self.work_dir.display(),
                    error = %e,
                    "Failed to list GRIB links"
                );
                return report;
            }
        };

        if links.is_empty() {
            info!(dir = %self.work_dir.display(), "No GRIB links found");
            return report;
        }

        for link in &links {
            match std::fs::remove_file(link) {
                Ok(()) => {
                    debug!(path = %link.display(), "Removed GRIB link");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(path = %link.display(), error = %e, "Failed to remove GRIB link");
                    report.failed += 1;
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failed,
            "Cleaned up GRIB links"
        );
        report
    }

    /// Run the link script over the month's source files.
    ///
    /// Returns the number of files handed to the script.
    pub async fn link(&self, month: YearMonth) -> Result<usize> {
        let files = self.source_files(month)?;
        if files.is_empty() {
            return Err(RunnerError::LinkFailure {
                month,
                reason: format!("no source files match {}", self.source_glob(month).display()),
            });
        }

        debug!(
            month = %month,
            script = %self.script.display(),
            files = files.len(),
            "Running link script"
        );

        let status = Command::new(&self.interpreter)
            .arg(&self.script)
            .args(&files)
            .current_dir(&self.work_dir)
            .status()
            .await
            .map_err(|e| RunnerError::LinkFailure {
                month,
                reason: format!("failed to run {} {}: {}", self.interpreter, self.script.display(), e),
            })?;

        if !status.success() {
            return Err(RunnerError::LinkFailure {
                month,
                reason: format!("link script exited with {}", status),
            });
        }

        info!(month = %month, files = files.len(), "Linked GRIB files");
        Ok(files.len())
    }
}
