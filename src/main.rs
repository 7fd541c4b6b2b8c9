use std::process::ExitCode;

use clap::Parser;

use entgraph::cli::{run, Cli};

fn main() -> ExitCode {
    ExitCode::from(run(&Cli::parse()))
}
