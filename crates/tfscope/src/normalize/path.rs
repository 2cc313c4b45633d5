//! Lexical path helpers shared by the resolver and the change filter.
//!
//! Nothing here touches the filesystem: changed paths may refer to files
//! that were deleted, so they are made absolute and cleaned, never
//! canonicalized.

use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Maximum path length for logging.
const MAX_PATH_LOG_LENGTH: usize = 256;

/// Make `path` absolute against `base` and remove `.`/`..` components.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        base.join(path).clean()
    }
}

/// Returns true when `file` is `dir` itself or lies strictly inside it.
///
/// The comparison is component-wise on cleaned paths, so `/a/bc` is not
/// under `/a/b`. A relative path is never under an absolute one and
/// vice versa.
pub fn is_under(file: &Path, dir: &Path) -> bool {
    if file.is_absolute() != dir.is_absolute() {
        return false;
    }
    file.clean().starts_with(dir.clean())
}

/// Shorten a path for log output, keeping its tail.
pub fn truncate_path(path: &Path) -> String {
    let s = path.display().to_string();
    if s.len() <= MAX_PATH_LOG_LENGTH {
        return s;
    }
    let mut start = s.len() - MAX_PATH_LOG_LENGTH + 3;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}
