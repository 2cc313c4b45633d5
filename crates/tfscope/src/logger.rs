//! Logging setup.
//!
//! Warnings about skipped modules go to stderr through `tracing` so that
//! stdout carries only the JSON document or the file list.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither a flag nor `RUST_LOG` says otherwise.
const DEFAULT_FILTER: &str = "tfscope=warn";

/// Initialize the global tracing subscriber.
///
/// The level is picked in this order:
/// 1. `verbose`: debug
/// 2. `quiet`: errors only
/// 3. `RUST_LOG`
/// 4. warnings and errors
///
/// Call once, before any logging happens.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("tfscope=debug")
    } else if quiet {
        EnvFilter::new("tfscope=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none())
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
