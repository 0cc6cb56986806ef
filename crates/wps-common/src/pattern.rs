//! Shell-style wildcard patterns for file names, expanded in-process.
//!
//! Only `*` (any run of characters) and `?` (one character) are special;
//! everything else matches literally. Patterns apply to the file name
//! only, never to directory components.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

#[derive(Debug, Clone)]
pub struct FilePattern {
    raw: String,
    regex: Regex,
}

impl FilePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut literal = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');

        Ok(Self {
            raw: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Entries of `dir` whose names match `pattern`, sorted by path.
///
/// Non UTF-8 names never match. Entries of any type are returned, including
/// dangling symbolic links.
pub fn matching_files(dir: &Path, pattern: &FilePattern) -> io::Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| pattern.is_match(n)) {
            matches.push(entry.path());
        }
    }

    matches.sort();
    Ok(matches)
}
