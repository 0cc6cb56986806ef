//! Monthly WPS ungrib runner.
//!
//! Walks a range of months and, for each one:
//! - Replaces the GRIBFILE links in the WPS directory with the month's ERA5 files
//! - Sets the namelist start/end dates to the month
//! - Submits the ungrib batch job
//! - Polls until the month's intermediate files are complete

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use ungrib_runner::config::{
    CommandsSection, ConfigFile, PathsSection, PatternsSection, PollSection, RangeSection,
};
use ungrib_runner::{MonthlyDriver, TokioSleeper};

#[derive(Parser, Debug)]
#[command(name = "ungrib-runner")]
#[command(about = "Run WPS ungrib over ERA5 data month by month")]
struct Args {
    /// YAML config file; command-line values override it
    #[arg(short, long, env = "UNGRIB_CONFIG")]
    config: Option<PathBuf>,

    /// WPS working directory
    #[arg(long, env = "UNGRIB_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Directory holding the ERA5 GRIB files
    #[arg(long, env = "UNGRIB_GRIB_DIR")]
    grib_dir: Option<PathBuf>,

    /// Directory ungrib writes intermediate files to (default: grib dir)
    #[arg(long, env = "UNGRIB_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Namelist file (default: <base-dir>/namelist.wps)
    #[arg(long, env = "UNGRIB_NAMELIST")]
    namelist: Option<PathBuf>,

    /// Batch job script (default: <base-dir>/wps.sh)
    #[arg(long, env = "UNGRIB_BATCH_SCRIPT")]
    batch_script: Option<PathBuf>,

    /// Link script (default: <base-dir>/link_grib.csh)
    #[arg(long, env = "UNGRIB_LINK_SCRIPT")]
    link_script: Option<PathBuf>,

    #[arg(long, env = "UNGRIB_START_YEAR")]
    start_year: Option<i32>,

    #[arg(long, env = "UNGRIB_START_MONTH")]
    start_month: Option<u32>,

    /// Defaults to the start year
    #[arg(long, env = "UNGRIB_END_YEAR")]
    end_year: Option<i32>,

    #[arg(long, env = "UNGRIB_END_MONTH")]
    end_month: Option<u32>,

    /// Interpreter for the link script (default: csh)
    #[arg(long, env = "UNGRIB_LINK_INTERPRETER")]
    link_interpreter: Option<String>,

    /// Batch submit command (default: qsub)
    #[arg(long, env = "UNGRIB_SUBMIT_COMMAND")]
    submit_command: Option<String>,

    /// Source file prefix; files are matched as <prefix>*YYYYMM* (default: e5)
    #[arg(long, env = "UNGRIB_SOURCE_PREFIX")]
    source_prefix: Option<String>,

    /// Output file prefix; files are matched as <prefix>:YYYY-MM-DD* (default: ERA5)
    #[arg(long, env = "UNGRIB_OUTPUT_PREFIX")]
    output_prefix: Option<String>,

    /// Seconds between output checks (default: 1800)
    #[arg(long, env = "UNGRIB_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,

    /// Output files expected for the last day of a month (default: 8)
    #[arg(long, env = "UNGRIB_EXPECTED_FILES")]
    expected_files: Option<usize>,

    /// Give up on a month after this many seconds (default: wait forever)
    #[arg(long, env = "UNGRIB_MAX_WAIT_SECS")]
    max_wait_secs: Option<u64>,

    /// Skip months whose output is already complete
    #[arg(long, env = "UNGRIB_SKIP_COMPLETE")]
    skip_complete: bool,

    /// Log level
    #[arg(long, env = "UNGRIB_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "UNGRIB_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Command-line values as a config layer.
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            paths: PathsSection {
                base_dir: self.base_dir.clone(),
                grib_dir: self.grib_dir.clone(),
                output_dir: self.output_dir.clone(),
                namelist: self.namelist.clone(),
                batch_script: self.batch_script.clone(),
                link_script: self.link_script.clone(),
            },
            range: RangeSection {
                start_year: self.start_year,
                start_month: self.start_month,
                end_year: self.end_year,
                end_month: self.end_month,
            },
            commands: CommandsSection {
                link_interpreter: self.link_interpreter.clone(),
                submit_command: self.submit_command.clone(),
            },
            patterns: PatternsSection {
                source_prefix: self.source_prefix.clone(),
                output_prefix: self.output_prefix.clone(),
            },
            poll: PollSection {
                interval_secs: self.poll_interval_secs,
                expected_files: self.expected_files,
                max_wait_secs: self.max_wait_secs,
            },
            // a bare flag can only switch skipping on
            skip_complete: self.skip_complete.then_some(true),
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigFile::default(),
    };
    let config = file
        .merge(args.overrides())
        .resolve()
        .context("Invalid configuration")?;

    info!(
        base_dir = %config.base_dir.display(),
        grib_dir = %config.grib_dir.display(),
        output_dir = %config.output_dir.display(),
        range = %config.range,
        poll_interval_secs = config.poll.interval.as_secs(),
        "Starting ungrib runner"
    );

    let mut driver = MonthlyDriver::new(&config, Arc::new(TokioSleeper));
    match driver.run().await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                skipped = summary.skipped,
                elapsed_secs = summary.elapsed.as_secs(),
                "Run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                error = %e,
                state = %driver.state(),
                month = ?driver.current().map(|m| m.to_string()),
                "Run aborted"
            );
            Err(e.into())
        }
    }
}
