//! Command-line demonstrator for `pedsim-core`.
//!
//! Wires population size / generation / mutation / theta / seed knobs
//! straight onto the library's public operations. Strictly a terminal
//! integration harness, not the "argument parsing from a host scripting
//! environment" excluded by the core's own scope.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use located_error::prelude::*;
use log::error;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logger::Logger::init(cli.verbosity());

    match commands::run(&cli).loc("pedsim-cli run failed") {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
