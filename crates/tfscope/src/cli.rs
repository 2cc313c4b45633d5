//! Command-line interface.
//!
//! `run` performs one invocation against explicit stdin/stdout handles so the
//! whole flow can be driven from tests; `main` only wires up the process.

use crate::affected::{collect_all_files, filter_related_files, is_affected, read_changed_paths};
use crate::module_graph::{ModuleGraphResolver, ResolveError};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Exit code when the module is affected, or on plain success.
pub const EXIT_AFFECTED: u8 = 0;
/// Exit code when `--affected` finds no changed path inside the module tree.
pub const EXIT_NOT_AFFECTED: u8 = 1;
/// Exit code for any error.
pub const EXIT_ERROR: u8 = 2;

const EXAMPLES: &str = "\
Examples:
  tfscope /path/to/terraform
  tfscope --files-only /path/to/terraform
  git diff --name-only | tfscope --files-only --filter-stdin /path/to/terraform
  git diff --name-only | tfscope --affected /path/to/terraform && terraform plan";

/// Resolve the local module tree of a Terraform root module.
#[derive(Parser, Debug)]
#[command(name = "tfscope", version, about, after_help = EXAMPLES)]
pub struct Cli {
    /// Root module directory
    pub directory: PathBuf,

    /// Output only file paths, one per line
    #[arg(long)]
    pub files_only: bool,

    /// Keep only files of modules touched by the paths read from stdin
    #[arg(long, requires = "files_only")]
    pub filter_stdin: bool,

    /// Read changed paths from stdin; exit 0 if the module is affected, 1 if not
    #[arg(long)]
    pub affected: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

/// Errors that end an invocation with [`EXIT_ERROR`].
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("error reading stdin: {0}")]
    Stdin(#[source] io::Error),
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Affected,
    NotAffected,
    Success,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Affected | Outcome::Success => EXIT_AFFECTED,
            Outcome::NotAffected => EXIT_NOT_AFFECTED,
        }
    }
}

/// Run one invocation.
///
/// `cwd` anchors the root directory argument and every relative changed
/// path. `--affected` wins over the output modes.
///
/// # Errors
///
/// Fails on fatal resolution errors, unreadable stdin, or when the output
/// cannot be written.
pub fn run<R: BufRead, W: Write>(
    cli: &Cli,
    cwd: &Path,
    stdin: R,
    out: &mut W,
) -> Result<Outcome, CliError> {
    let root = cwd.join(&cli.directory);
    let result = ModuleGraphResolver::new().analyze(&root)?;

    if cli.affected {
        let changed = read_changed_paths(stdin).map_err(CliError::Stdin)?;
        let affected = is_affected(&changed, &result, cwd);
        debug!(changed = changed.len(), affected, "checked changed paths");
        return Ok(if affected {
            Outcome::Affected
        } else {
            Outcome::NotAffected
        });
    }

    if cli.files_only {
        let mut files = collect_all_files(&result);
        if cli.filter_stdin {
            let changed = read_changed_paths(stdin).map_err(CliError::Stdin)?;
            files = filter_related_files(&files, &changed, &result, cwd);
        }
        for file in &files {
            writeln!(out, "{}", file.display())?;
        }
    } else {
        serde_json::to_writer_pretty(&mut *out, &result)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(Outcome::Success)
}
