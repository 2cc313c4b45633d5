//! Local versus remote module sources.

/// Returns true when a module source is a relative filesystem path.
///
/// Only `./` and `../` prefixes count. Registry addresses, `git::`/`s3::`
/// locators, bare names and absolute paths are all treated as remote.
pub fn is_local(source: &str) -> bool {
    source.starts_with("./") || source.starts_with("../")
}
