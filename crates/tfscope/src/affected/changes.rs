//! Changed path input.
//!
//! Reads newline-delimited paths (typically `git diff --name-only`) and
//! resolves them against the caller's working directory.

use crate::normalize::path::absolutize;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

/// Read one path per line, trimming whitespace and dropping blank lines.
///
/// # Errors
///
/// Returns the underlying I/O error if the reader fails or yields invalid
/// UTF-8.
pub fn read_changed_paths<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(trimmed.to_string());
        }
    }
    Ok(paths)
}

/// Resolve changed paths to absolute, lexically cleaned paths.
///
/// Relative paths are joined onto `cwd`. Duplicates are kept; callers only
/// test membership.
pub fn resolve_changed_paths<P: AsRef<Path>>(changed: &[P], cwd: &Path) -> Vec<PathBuf> {
    changed
        .iter()
        .map(|p| absolutize(p.as_ref(), cwd))
        .collect()
}
