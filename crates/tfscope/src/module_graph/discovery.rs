//! Configuration file discovery.
//!
//! Lists the `.tf` and `.tf.json` files directly inside a module directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recognized configuration file suffixes.
pub const CONFIG_SUFFIXES: &[&str] = &[".tf", ".tf.json"];

/// List configuration files directly inside `dir`, sorted by file name.
///
/// Subdirectories are skipped even when their name carries a configuration
/// suffix. Each returned path is `dir` joined with the entry name.
///
/// # Errors
///
/// Returns the underlying I/O error when `dir` cannot be read.
pub fn list_config_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_config_file_name(name) {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Check if a file name carries a configuration suffix.
pub fn is_config_file_name(name: &str) -> bool {
    CONFIG_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
