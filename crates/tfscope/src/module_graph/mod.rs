//! Module graph resolution.
//!
//! Discovers the files of a root module and every local module it calls,
//! and records the remote module calls found along the way.

pub mod classify;
pub mod discovery;
pub mod model;
pub mod parser;
pub mod resolver;

pub use classify::is_local;
pub use discovery::list_config_files;
pub use model::{ModuleRecord, RemoteModuleReference, ResolutionResult, ROOT_CALLER};
pub use parser::{ConfigParser, TerraformParser};
pub use resolver::{Analysis, ModuleGraphResolver, ResolveError, ResolveWarning};
