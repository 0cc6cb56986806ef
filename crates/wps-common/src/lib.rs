//! Common types and utilities shared by the WPS preprocessing tools.

pub mod error;
pub mod month;
pub mod namelist;
pub mod pattern;

pub use error::{NamelistError, NamelistResult};
pub use month::{MonthError, MonthRange, YearMonth};
pub use namelist::{DateField, DateWindow, Namelist, WPS_TIMESTAMP_FORMAT};
pub use pattern::{matching_files, FilePattern};
