//! examplegen CLI: regenerates the examples README and per-example CI workflows.
//!
//! Scans an examples tree, normalizes notebook kernels, writes one workflow
//! per discovered example and rebuilds the README table of contents.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
