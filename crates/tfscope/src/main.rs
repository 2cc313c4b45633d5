#![allow(clippy::print_stderr)]

use clap::Parser;
use std::io;
use std::process::ExitCode;
use tfscope::cli::{self, Cli, CliError, EXIT_ERROR};
use tfscope::logger;

fn main() -> ExitCode {
    let args = Cli::parse();
    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let outcome = std::env::current_dir()
        .map_err(CliError::WorkingDir)
        .and_then(|cwd| cli::run(&args, &cwd, io::stdin().lock(), &mut io::stdout().lock()));

    match outcome {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
