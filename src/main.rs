//! Mapframe - command-line tool for quantizing images onto map surfaces

use std::process::ExitCode;

use mapframe::cli;

fn main() -> ExitCode {
    cli::run()
}
