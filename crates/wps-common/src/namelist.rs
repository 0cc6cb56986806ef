//! Reading and rewriting the date window of a WPS `namelist.wps`.
//!
//! Only the first `start_date` and `end_date` values of the `&share` block
//! are touched; everything else in the file is preserved byte for byte.

use std::fmt;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{NamelistError, NamelistResult};
use crate::month::YearMonth;

/// Timestamp layout used by WPS, e.g. `2020-12-01_00:00:00`.
pub const WPS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

static START_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstart_date\s*=\s*'([^']+)'").unwrap());
static END_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bend_date\s*=\s*'([^']+)'").unwrap());

/// The two date fields the editor manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn key(self) -> &'static str {
        match self {
            DateField::Start => "start_date",
            DateField::End => "end_date",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            DateField::Start => &START_DATE_RE,
            DateField::End => &END_DATE_RE,
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Start and end instants written into the namelist for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// `[first instant of month, first instant of following month)`.
    pub fn for_month(month: YearMonth) -> Self {
        Self {
            start: month.first_instant(),
            end: month.next().first_instant(),
        }
    }

    pub fn start_string(&self) -> String {
        self.start.format(WPS_TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(WPS_TIMESTAMP_FORMAT).to_string()
    }
}

/// Byte span of the quoted value of `field` (quotes excluded).
fn value_span(text: &str, field: DateField) -> NamelistResult<Range<usize>> {
    field
        .regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
        .ok_or(NamelistError::MissingField { field })
}

/// Extract the current `(start_date, end_date)` values from namelist text.
pub fn extract_dates(text: &str) -> NamelistResult<(String, String)> {
    let start = value_span(text, DateField::Start)?;
    let end = value_span(text, DateField::End)?;
    Ok((text[start].to_string(), text[end].to_string()))
}

/// Return `text` with both date values replaced by `window`.
///
/// The replacement is applied to the exact spans `extract_dates` reads, so
/// the spacing around `=` does not matter. The result is re-read before it
/// is returned and any mismatch is reported as `NotUpdated`.
pub fn rewrite_dates(text: &str, window: &DateWindow) -> NamelistResult<String> {
    let start_value = window.start_string();
    let end_value = window.end_string();

    let mut edits = [
        (value_span(text, DateField::Start)?, start_value.as_str()),
        (value_span(text, DateField::End)?, end_value.as_str()),
    ];
    // Later spans first so earlier offsets stay valid.
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

    let mut updated = text.to_string();
    for (span, value) in edits {
        updated.replace_range(span, value);
    }

    let (found_start, found_end) = extract_dates(&updated)?;
    for (field, expected, found) in [
        (DateField::Start, start_value, found_start),
        (DateField::End, end_value, found_end),
    ] {
        if expected != found {
            return Err(NamelistError::NotUpdated {
                field,
                expected,
                found,
            });
        }
    }

    Ok(updated)
}

/// A `namelist.wps` file on disk.
#[derive(Debug, Clone)]
pub struct Namelist {
    path: PathBuf,
}

impl Namelist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> NamelistError {
        NamelistError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub fn read(&self) -> NamelistResult<String> {
        std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    /// Current `(start_date, end_date)` values in the file.
    pub fn extract_dates(&self) -> NamelistResult<(String, String)> {
        extract_dates(&self.read()?)
    }

    /// Point the namelist at `month` and write it back.
    pub fn update(&self, month: YearMonth) -> NamelistResult<DateWindow> {
        let window = DateWindow::for_month(month);
        let text = self.read()?;

        let (old_start, old_end) = extract_dates(&text)?;
        debug!(
            path = %self.path.display(),
            old_start = %old_start,
            old_end = %old_end,
            "Current namelist dates"
        );

        let updated = rewrite_dates(&text, &window)?;
        self.write(&updated)?;

        info!(
            path = %self.path.display(),
            start_date = %window.start_string(),
            end_date = %window.end_string(),
            "Updated namelist"
        );
        Ok(window)
    }

    /// Replace the file through a temporary sibling so readers never see a
    /// partially written namelist.
    ///
    /// Symbolic links are followed: the link's target is replaced and the
    /// link itself stays in place.
    fn write(&self, contents: &str) -> NamelistResult<()> {
        let target = std::fs::canonicalize(&self.path).map_err(|e| self.io_error(e))?;
        let dir = target.parent().unwrap_or_else(|| Path::new("/"));

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        // tempfile creates 0600; keep whatever mode the namelist had.
        let metadata = std::fs::metadata(&target).map_err(|e| self.io_error(e))?;
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| self.io_error(e))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        file.persist(&target)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}
