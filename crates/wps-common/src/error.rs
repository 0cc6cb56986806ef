//! Error types for namelist handling.

use std::path::PathBuf;

use thiserror::Error;

use crate::namelist::DateField;

/// Result type alias using NamelistError.
pub type NamelistResult<T> = Result<T, NamelistError>;

/// Errors raised while reading or rewriting a `namelist.wps` file.
#[derive(Debug, Error)]
pub enum NamelistError {
    #[error("Failed to access namelist {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find {field} in namelist")]
    MissingField { field: DateField },

    #[error("Namelist {field} was not updated: expected '{expected}', found '{found}'")]
    NotUpdated {
        field: DateField,
        expected: String,
        found: String,
    },
}
