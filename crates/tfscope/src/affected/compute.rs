//! Change impact over a resolution result.
//!
//! A module is affected when a changed path lies inside its resolved
//! directory. Nothing here touches the filesystem.

use super::changes::resolve_changed_paths;
use crate::module_graph::{ModuleRecord, ResolutionResult};
use crate::normalize::path::is_under;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Every file of the root and local modules, first occurrence kept.
pub fn collect_all_files(result: &ResolutionResult) -> Vec<PathBuf> {
    dedup_files(result.modules())
}

/// Check whether any changed path falls inside the root or a local module.
///
/// Relative paths in `changed` are resolved against `cwd`.
pub fn is_affected<P: AsRef<Path>>(changed: &[P], result: &ResolutionResult, cwd: &Path) -> bool {
    resolve_changed_paths(changed, cwd)
        .iter()
        .any(|path| result.modules().any(|m| is_under(path, &m.resolved_path)))
}

/// Files of the modules touched by `changed`, root first, then local
/// modules in discovery order.
///
/// `all_files` is accepted alongside [`collect_all_files`] but the output is
/// built from the module records in `result`, so files outside any module
/// never appear.
pub fn filter_related_files<P: AsRef<Path>>(
    _all_files: &[PathBuf],
    changed: &[P],
    result: &ResolutionResult,
    cwd: &Path,
) -> Vec<PathBuf> {
    let changed: HashSet<PathBuf> = resolve_changed_paths(changed, cwd).into_iter().collect();
    let affected = result
        .modules()
        .filter(|m| changed.iter().any(|path| is_under(path, &m.resolved_path)));
    dedup_files(affected)
}

fn dedup_files<'a>(modules: impl Iterator<Item = &'a ModuleRecord>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for module in modules {
        for file in &module.files {
            if seen.insert(file) {
                files.push(file.clone());
            }
        }
    }
    files
}
