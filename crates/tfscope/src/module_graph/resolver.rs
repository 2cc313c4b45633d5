//! Depth-first module graph resolution.
//!
//! Starting at a root directory, follows every local module call, collects
//! the configuration files of each module reached and records remote calls
//! without following them. Each canonical directory is visited at most once,
//! which is what keeps circular references finite.

use super::classify::is_local;
use super::discovery::list_config_files;
use super::model::{ModuleRecord, RemoteModuleReference, ResolutionResult, ROOT_CALLER};
use super::parser::{ConfigParser, ModuleCall, TerraformParser};
use crate::normalize::path::truncate_path;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort resolution at the level where they occur.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to get absolute path of {}: {source}", path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list terraform files in root {}: {source}", path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load module {}: {diagnostics}", dir.display())]
    Parse { dir: PathBuf, diagnostics: String },
}

/// Problems that skip part of the tree without failing the run.
#[derive(Debug, Error)]
pub enum ResolveWarning {
    #[error("cannot read module {name:?} at {}: {source}", path.display())]
    UnreadableModule {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to analyze {}: {source}", path.display())]
    NestedFailure {
        path: PathBuf,
        #[source]
        source: Box<ResolveError>,
    },
}

/// A resolution result plus the warnings raised while producing it.
#[derive(Debug)]
pub struct Analysis {
    pub result: ResolutionResult,
    pub warnings: Vec<ResolveWarning>,
}

/// Mutable state owned by one `analyze` call.
#[derive(Default)]
struct TraversalContext {
    visited: HashSet<PathBuf>,
    recorded: HashSet<PathBuf>,
    local_modules: Vec<ModuleRecord>,
    remote_modules: Vec<RemoteModuleReference>,
    warnings: Vec<ResolveWarning>,
}

/// Resolves the local module tree of a root module.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraphResolver<P = TerraformParser> {
    parser: P,
}

impl ModuleGraphResolver<TerraformParser> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: ConfigParser> ModuleGraphResolver<P> {
    /// Create a resolver that reads module calls through `parser`.
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    /// Resolve `root_dir` and every local module reachable from it.
    ///
    /// # Errors
    ///
    /// Fails when the root cannot be canonicalized or listed, or when the
    /// root module itself does not parse. Failures below the root are
    /// logged as warnings instead.
    pub fn analyze(&self, root_dir: &Path) -> Result<ResolutionResult, ResolveError> {
        self.analyze_with_warnings(root_dir)
            .map(|analysis| analysis.result)
    }

    /// Like [`analyze`](Self::analyze) but also returns the non-fatal
    /// warnings raised during traversal.
    ///
    /// # Errors
    ///
    /// Same conditions as [`analyze`](Self::analyze).
    pub fn analyze_with_warnings(&self, root_dir: &Path) -> Result<Analysis, ResolveError> {
        let root_path = root_dir
            .canonicalize()
            .map_err(|source| ResolveError::Canonicalize {
                path: root_dir.to_path_buf(),
                source,
            })?;
        let root_files = list_config_files(&root_path).map_err(|source| ResolveError::ReadRoot {
            path: root_path.clone(),
            source,
        })?;

        debug!(root = %root_path.display(), "resolving module tree");

        let mut ctx = TraversalContext::default();
        self.visit(&root_path, ROOT_CALLER, &mut ctx)?;

        debug!(
            local = ctx.local_modules.len(),
            remote = ctx.remote_modules.len(),
            warnings = ctx.warnings.len(),
            "module tree resolved"
        );

        Ok(Analysis {
            result: ResolutionResult {
                root_module: ModuleRecord::root(root_path, root_files),
                local_modules: ctx.local_modules,
                remote_modules: ctx.remote_modules,
            },
            warnings: ctx.warnings,
        })
    }

    fn visit(&self, dir: &Path, caller: &str, ctx: &mut TraversalContext) -> Result<(), ResolveError> {
        if !ctx.visited.insert(dir.to_path_buf()) {
            debug!(dir = %truncate_path(dir), "already visited");
            return Ok(());
        }

        let loaded = self.parser.load_module(dir);
        if loaded.has_errors() {
            return Err(ResolveError::Parse {
                dir: dir.to_path_buf(),
                diagnostics: loaded.error_summary(),
            });
        }
        for diagnostic in loaded.warnings() {
            warn!("{diagnostic}");
        }

        for call in loaded.calls {
            if is_local(&call.source) {
                self.visit_local(dir, call, ctx);
            } else {
                ctx.remote_modules.push(RemoteModuleReference {
                    name: call.name,
                    source: call.source,
                    version: call.version,
                    called_from: caller.to_string(),
                });
            }
        }

        Ok(())
    }

    fn visit_local(&self, dir: &Path, call: ModuleCall, ctx: &mut TraversalContext) {
        let joined = dir.join(&call.source);
        let listing = joined
            .canonicalize()
            .and_then(|resolved| list_config_files(&resolved).map(|files| (resolved, files)));
        let (resolved, files) = match listing {
            Ok(found) => found,
            Err(source) => {
                warn!(
                    "cannot read {} for module {:?}: {source}",
                    truncate_path(&joined),
                    call.name
                );
                ctx.warnings.push(ResolveWarning::UnreadableModule {
                    name: call.name,
                    path: joined,
                    source,
                });
                return;
            }
        };

        if ctx.recorded.insert(resolved.clone()) {
            ctx.local_modules.push(ModuleRecord::local(
                call.name.clone(),
                call.source,
                resolved.clone(),
                files,
            ));
        }

        if let Err(e) = self.visit(&resolved, &call.name, ctx) {
            warn!("failed to analyze {}: {e}", truncate_path(&resolved));
            ctx.warnings.push(ResolveWarning::NestedFailure {
                path: resolved,
                source: Box::new(e),
            });
        }
    }
}
