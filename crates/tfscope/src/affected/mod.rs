//! Change impact detection.
//!
//! Answers whether a resolved module tree is touched by a set of changed
//! paths, and which of its files are relevant to them.

pub mod changes;
pub mod compute;

pub use changes::{read_changed_paths, resolve_changed_paths};
pub use compute::{collect_all_files, filter_related_files, is_affected};
