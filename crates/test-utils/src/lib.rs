//! Shared test utilities for the wps-ungrib workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scratch WPS layout (base, GRIB source and output directories)
//! - Sample `namelist.wps` documents
//! - Generators for ERA5 source files, ungrib output files and stub scripts
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{WpsSandbox, create_intermediate_files};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Collect the file names of `paths`, in order.
///
/// Panics on paths without a UTF-8 file name; intended for assertions only.
pub fn file_names<P: AsRef<std::path::Path>>(paths: &[P]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.as_ref()
                .file_name()
                .and_then(|n| n.to_str())
                .expect("test path has a UTF-8 file name")
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_names() {
        let paths = vec![PathBuf::from("/a/b/GRIBFILE.000"), PathBuf::from("ERA5:2020-12-31_00")];
        assert_eq!(file_names(&paths), vec!["GRIBFILE.000", "ERA5:2020-12-31_00"]);
    }
}
