//! Run configuration.
//!
//! Settings come from an optional YAML file and from the command line (or
//! `UNGRIB_*` environment variables); command-line values win. The merged
//! settings are validated once into an immutable [`RunConfig`] that every
//! component borrows from.
//!
//! Relative paths are resolved against the process working directory when
//! the config is built. External scripts run with the WPS directory as their
//! working directory, so every path handed to them must be absolute.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use wps_common::MonthRange;

use crate::error::ConfigError;
use crate::poller::{PollPolicy, DEFAULT_EXPECTED_FILES, DEFAULT_POLL_INTERVAL_SECS};

pub const DEFAULT_NAMELIST: &str = "namelist.wps";
pub const DEFAULT_BATCH_SCRIPT: &str = "wps.sh";
pub const DEFAULT_LINK_SCRIPT: &str = "link_grib.csh";
pub const DEFAULT_LINK_INTERPRETER: &str = "csh";
pub const DEFAULT_SUBMIT_COMMAND: &str = "qsub";
pub const DEFAULT_SOURCE_PREFIX: &str = "e5";
pub const DEFAULT_OUTPUT_PREFIX: &str = "ERA5";

/// Directory and file locations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PathsSection {
    /// WPS working directory; GRIBFILE links are created here
    pub base_dir: Option<PathBuf>,
    /// Directory holding the raw ERA5 GRIB files
    pub grib_dir: Option<PathBuf>,
    /// Directory ungrib writes intermediate files to (default: grib_dir)
    pub output_dir: Option<PathBuf>,
    pub namelist: Option<PathBuf>,
    pub batch_script: Option<PathBuf>,
    pub link_script: Option<PathBuf>,
}

/// Months to process.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RangeSection {
    pub start_year: Option<i32>,
    pub start_month: Option<u32>,
    /// Defaults to start_year
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,
}

/// External commands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandsSection {
    /// Interpreter the link script is run with
    pub link_interpreter: Option<String>,
    /// Batch scheduler submit command
    pub submit_command: Option<String>,
}

/// File-name prefixes for source and output files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PatternsSection {
    /// Source files are matched as `<source_prefix>*<YYYYMM>*`
    pub source_prefix: Option<String>,
    /// Output files are matched as `<output_prefix>:<YYYY-MM-DD>*`
    pub output_prefix: Option<String>,
}

/// Completion polling.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PollSection {
    pub interval_secs: Option<u64>,
    /// Files expected for the last day of the month
    pub expected_files: Option<usize>,
    /// Give up after this long; unset means wait indefinitely
    pub max_wait_secs: Option<u64>,
}

/// Raw settings as read from YAML or assembled from command-line flags.
///
/// Every field is optional so that partial sources can be merged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub range: RangeSection,
    #[serde(default)]
    pub commands: CommandsSection,
    #[serde(default)]
    pub patterns: PatternsSection,
    #[serde(default)]
    pub poll: PollSection,
    /// Skip months whose output is already complete
    pub skip_complete: Option<bool>,
}

impl ConfigFile {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ConfigFile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Overlay `overrides` on top of `self`; values set in `overrides` win.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        let (base, over) = (self, overrides);
        ConfigFile {
            paths: PathsSection {
                base_dir: over.paths.base_dir.or(base.paths.base_dir),
                grib_dir: over.paths.grib_dir.or(base.paths.grib_dir),
                output_dir: over.paths.output_dir.or(base.paths.output_dir),
                namelist: over.paths.namelist.or(base.paths.namelist),
                batch_script: over.paths.batch_script.or(base.paths.batch_script),
                link_script: over.paths.link_script.or(base.paths.link_script),
            },
            range: RangeSection {
                start_year: over.range.start_year.or(base.range.start_year),
                start_month: over.range.start_month.or(base.range.start_month),
                end_year: over.range.end_year.or(base.range.end_year),
                end_month: over.range.end_month.or(base.range.end_month),
            },
            commands: CommandsSection {
                link_interpreter: over
                    .commands
                    .link_interpreter
                    .or(base.commands.link_interpreter),
                submit_command: over.commands.submit_command.or(base.commands.submit_command),
            },
            patterns: PatternsSection {
                source_prefix: over.patterns.source_prefix.or(base.patterns.source_prefix),
                output_prefix: over.patterns.output_prefix.or(base.patterns.output_prefix),
            },
            poll: PollSection {
                interval_secs: over.poll.interval_secs.or(base.poll.interval_secs),
                expected_files: over.poll.expected_files.or(base.poll.expected_files),
                max_wait_secs: over.poll.max_wait_secs.or(base.poll.max_wait_secs),
            },
            skip_complete: over.skip_complete.or(base.skip_complete),
        }
    }

    /// Apply defaults and validate into a [`RunConfig`].
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let base_dir = absolute(
            self.paths
                .base_dir
                .ok_or(ConfigError::Missing("paths.base_dir"))?,
        )?;
        let grib_dir = absolute(
            self.paths
                .grib_dir
                .ok_or(ConfigError::Missing("paths.grib_dir"))?,
        )?;
        let output_dir = match self.paths.output_dir {
            Some(dir) => absolute(dir)?,
            None => grib_dir.clone(),
        };
        let namelist_path = match self.paths.namelist {
            Some(path) => absolute(path)?,
            None => base_dir.join(DEFAULT_NAMELIST),
        };
        let batch_script = match self.paths.batch_script {
            Some(path) => absolute(path)?,
            None => base_dir.join(DEFAULT_BATCH_SCRIPT),
        };
        let link_script = match self.paths.link_script {
            Some(path) => absolute(path)?,
            None => base_dir.join(DEFAULT_LINK_SCRIPT),
        };

        let start_year = self
            .range
            .start_year
            .ok_or(ConfigError::Missing("range.start_year"))?;
        let start_month = self
            .range
            .start_month
            .ok_or(ConfigError::Missing("range.start_month"))?;
        let end_month = self
            .range
            .end_month
            .ok_or(ConfigError::Missing("range.end_month"))?;
        let range = MonthRange::from_parts(start_year, start_month, self.range.end_year, end_month)?;

        let link_interpreter = non_empty(
            "commands.link_interpreter",
            self.commands.link_interpreter,
            DEFAULT_LINK_INTERPRETER,
        )?;
        let submit_command = non_empty(
            "commands.submit_command",
            self.commands.submit_command,
            DEFAULT_SUBMIT_COMMAND,
        )?;
        let source_prefix = file_name_prefix(
            "patterns.source_prefix",
            self.patterns.source_prefix,
            DEFAULT_SOURCE_PREFIX,
        )?;
        let output_prefix = file_name_prefix(
            "patterns.output_prefix",
            self.patterns.output_prefix,
            DEFAULT_OUTPUT_PREFIX,
        )?;

        let interval_secs = self.poll.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(invalid("poll.interval_secs", "must be greater than zero"));
        }
        let expected_files = self.poll.expected_files.unwrap_or(DEFAULT_EXPECTED_FILES);
        if expected_files == 0 {
            return Err(invalid("poll.expected_files", "must be greater than zero"));
        }
        let max_wait = match self.poll.max_wait_secs {
            Some(0) => return Err(invalid("poll.max_wait_secs", "must be greater than zero")),
            other => other.map(Duration::from_secs),
        };

        Ok(RunConfig {
            base_dir,
            grib_dir,
            output_dir,
            namelist_path,
            batch_script,
            link_script,
            range,
            link_interpreter,
            submit_command,
            source_prefix,
            output_prefix,
            poll: PollPolicy {
                interval: Duration::from_secs(interval_secs),
                expected_files,
                max_wait,
            },
            skip_complete: self.skip_complete.unwrap_or(false),
        })
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf, ConfigError> {
    std::path::absolute(&path).map_err(|source| ConfigError::Resolve { path, source })
}

fn invalid(name: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        message: message.to_string(),
    }
}

fn non_empty(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    if value.trim().is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    Ok(value)
}

fn file_name_prefix(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    let value = non_empty(name, value, default)?;
    if value.contains('/') {
        return Err(invalid(name, "must be a file-name prefix, not a path"));
    }
    Ok(value)
}

/// Validated, immutable settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_dir: PathBuf,
    pub grib_dir: PathBuf,
    pub output_dir: PathBuf,
    pub namelist_path: PathBuf,
    pub batch_script: PathBuf,
    pub link_script: PathBuf,
    pub range: MonthRange,
    pub link_interpreter: String,
    pub submit_command: String,
    pub source_prefix: String,
    pub output_prefix: String,
    pub poll: PollPolicy,
    pub skip_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConfigFile {
        ConfigFile {
            paths: PathsSection {
                base_dir: Some(PathBuf::from("/glade/work/wps")),
                grib_dir: Some(PathBuf::from("/glade/scratch/era5")),
                ..Default::default()
            },
            range: RangeSection {
                start_year: Some(2020),
                start_month: Some(12),
                end_month: Some(12),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = minimal().resolve().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/glade/scratch/era5"));
        assert_eq!(config.namelist_path, PathBuf::from("/glade/work/wps/namelist.wps"));
        assert_eq!(config.batch_script, PathBuf::from("/glade/work/wps/wps.sh"));
        assert_eq!(config.link_script, PathBuf::from("/glade/work/wps/link_grib.csh"));
        assert_eq!(config.link_interpreter, "csh");
        assert_eq!(config.submit_command, "qsub");
        assert_eq!(config.source_prefix, "e5");
        assert_eq!(config.output_prefix, "ERA5");
        assert_eq!(config.poll.interval, Duration::from_secs(1800));
        assert_eq!(config.poll.expected_files, 8);
        assert_eq!(config.poll.max_wait, None);
        assert!(!config.skip_complete);
        assert_eq!(config.range.len(), 1);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
paths:
  base_dir: /glade/work/kukulies/wpsv4.6.0
  grib_dir: /glade/derecho/scratch/kukulies/era5
  output_dir: /glade/derecho/scratch/kukulies/era5/intermediate

range:
  start_year: 2020
  start_month: 11
  end_year: 2021
  end_month: 2

commands:
  link_interpreter: tcsh
  submit_command: sbatch

poll:
  interval_secs: 600
  max_wait_secs: 86400

skip_complete: true
"#;

        let config: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        let config = config.resolve().unwrap();
        assert_eq!(config.range.len(), 4);
        assert_eq!(config.link_interpreter, "tcsh");
        assert_eq!(config.submit_command, "sbatch");
        assert_eq!(config.poll.interval, Duration::from_secs(600));
        assert_eq!(config.poll.max_wait, Some(Duration::from_secs(86400)));
        assert_eq!(
            config.output_dir,
            PathBuf::from("/glade/derecho/scratch/kukulies/era5/intermediate")
        );
        assert!(config.skip_complete);
    }

    #[test]
    fn test_empty_yaml_is_all_unset() {
        let config: ConfigFile = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigFile {
            range: RangeSection {
                end_month: Some(3),
                start_month: Some(1),
                start_year: Some(2021),
                ..Default::default()
            },
            poll: PollSection {
                interval_secs: Some(60),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = minimal().merge(overrides).resolve().unwrap();
        assert_eq!(config.range.start().to_string(), "2021-01");
        assert_eq!(config.range.end().to_string(), "2021-03");
        assert_eq!(config.poll.interval, Duration::from_secs(60));
        // untouched values come from the base
        assert_eq!(config.base_dir, PathBuf::from("/glade/work/wps"));
    }

    #[test]
    fn test_missing_base_dir() {
        let mut file = minimal();
        file.paths.base_dir = None;
        assert!(matches!(
            file.resolve(),
            Err(ConfigError::Missing("paths.base_dir"))
        ));
    }

    #[test]
    fn test_missing_end_month() {
        let mut file = minimal();
        file.range.end_month = None;
        assert!(matches!(
            file.resolve(),
            Err(ConfigError::Missing("range.end_month"))
        ));
    }

    #[test]
    fn test_invalid_month() {
        let mut file = minimal();
        file.range.end_month = Some(13);
        assert!(matches!(file.resolve(), Err(ConfigError::Range(_))));
    }

    #[test]
    fn test_reversed_range() {
        let mut file = minimal();
        file.range.start_month = Some(12);
        file.range.end_month = Some(1);
        assert!(matches!(file.resolve(), Err(ConfigError::Range(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut file = minimal();
        file.poll.interval_secs = Some(0);
        assert!(matches!(
            file.resolve(),
            Err(ConfigError::Invalid {
                name: "poll.interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_prefix_must_not_be_path() {
        let mut file = minimal();
        file.patterns.output_prefix = Some("out/ERA5".to_string());
        assert!(matches!(
            file.resolve(),
            Err(ConfigError::Invalid {
                name: "patterns.output_prefix",
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/ungrib.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ungrib.yaml");
        std::fs::write(&path, "range: [not, a, map").unwrap();
        assert!(matches!(
            ConfigFile::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let mut file = minimal();
        file.paths.base_dir = Some(PathBuf::from("wps"));
        file.paths.grib_dir = Some(PathBuf::from("era5"));
        file.paths.batch_script = Some(PathBuf::from("jobs/wps.sh"));

        let config = file.resolve().unwrap();
        assert_eq!(config.base_dir, cwd.join("wps"));
        assert_eq!(config.grib_dir, cwd.join("era5"));
        assert_eq!(config.output_dir, cwd.join("era5"));
        assert_eq!(config.namelist_path, cwd.join("wps/namelist.wps"));
        assert_eq!(config.link_script, cwd.join("wps/link_grib.csh"));
        assert_eq!(config.batch_script, cwd.join("jobs/wps.sh"));
    }
}
