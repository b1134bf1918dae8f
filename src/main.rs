//! Entry point for the ru_cube application.
//! Parses the command line, installs logging and dispatches the subcommand.

use clap::Parser;
use ru_cube::cli::{self, Args};
use ru_cube::logging::init_logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", cli::render_error(&error, args.debug));
            ExitCode::FAILURE
        }
    }
}
