//! Generators for the files a WPS run reads and produces.
//!
//! File contents are irrelevant to the runner; only names and counts are
//! checked, so every generated file is empty.

use std::path::{Path, PathBuf};

/// ERA5 variables used to name synthetic source files (param codes from the
/// RDA ds633.0 naming scheme).
const ERA5_PARAMS: [&str; 6] = [
    "128_130_t",
    "128_131_u",
    "128_132_v",
    "128_133_q",
    "128_129_z",
    "128_157_r",
];

/// File name in the RDA ERA5 layout, e.g.
/// `e5.oper.an.pl.128_130_t.ll025sc.2020120100_2020120123.grb`.
///
/// `index` picks the variable, and the day once variables are exhausted.
pub fn era5_source_name(year: i32, month: u32, index: usize) -> String {
    let param = ERA5_PARAMS[index % ERA5_PARAMS.len()];
    let day = index / ERA5_PARAMS.len() + 1;
    format!(
        "e5.oper.an.pl.{param}.ll025sc.{year:04}{month:02}{day:02}00_{year:04}{month:02}{day:02}23.grb"
    )
}

/// Create `count` empty ERA5 source files for one month in `dir`.
pub fn create_source_files(dir: &Path, year: i32, month: u32, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(era5_source_name(year, month, i));
            std::fs::write(&path, b"").expect("write source file");
            path
        })
        .collect()
}

/// Ungrib intermediate file name, e.g. `ERA5:2020-12-31_03`.
pub fn intermediate_file_name(prefix: &str, date: &str, hour: u32) -> String {
    format!("{prefix}:{date}_{hour:02}")
}

/// Create `count` 3-hourly intermediate files for `date` (`YYYY-MM-DD`).
///
/// Counts above 8 keep stepping by three hours, which yields names such as
/// `_24`; the runner only counts them.
pub fn create_intermediate_files(dir: &Path, prefix: &str, date: &str, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(intermediate_file_name(prefix, date, i as u32 * 3));
            std::fs::write(&path, b"").expect("write intermediate file");
            path
        })
        .collect()
}

/// Write a `/bin/sh` script and make it executable.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
    }

    path
}

/// File the stub link script appends its arguments to, one per line.
pub const LINK_LOG: &str = "link_args.log";

/// Body of a stand-in for `link_grib.csh`: links every argument into the
/// current directory as `GRIBFILE.000`, `GRIBFILE.001`, ... and records the
/// arguments in [`LINK_LOG`].
pub const LINK_SCRIPT_BODY: &str = r#"i=0
for f in "$@"; do
  ln -sf "$f" "GRIBFILE.$(printf '%03d' "$i")"
  echo "$f" >> link_args.log
  i=$((i + 1))
done"#;

/// Body of a job script that produces `count` intermediate files for `date`
/// and prints `job_id` the way `qsub` does.
pub fn job_script_body(output_dir: &Path, prefix: &str, date: &str, count: usize, job_id: &str) -> String {
    let mut body = String::new();
    for i in 0..count {
        let name = intermediate_file_name(prefix, date, i as u32 * 3);
        body.push_str(&format!("touch '{}'\n", output_dir.join(name).display()));
    }
    body.push_str(&format!("echo '{job_id}'"));
    body
}
