//! Bindery CLI

mod cli;

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bindery::builder::toolchain::Tool;
use bindery::collab::external::{ExternalEmitter, ExternalIndexer};
use bindery::ops::{parse_key_value_pairs, Interop, InteropOutput};
use bindery::util::diagnostic;

use crate::cli::Cli;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bindery=debug")
    } else {
        EnvFilter::new("bindery=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let (flavor, args, options) = cli.into_arguments();

    // Collaborators come from the same toolchain config the run uses.
    let tool = Tool::prepare(
        args.target.as_deref(),
        flavor,
        args.home.as_deref(),
        &parse_key_value_pairs(&args.override_properties),
    )?;
    let collaborators = &tool.config().collaborators;
    let indexer = collaborators
        .indexer
        .clone()
        .map(ExternalIndexer::new)
        .ok_or_else(|| anyhow!("no indexer configured; set [collaborators.indexer] in toolchain.toml"))?;
    let emitter = collaborators
        .emitter
        .clone()
        .map(ExternalEmitter::new)
        .ok_or_else(|| anyhow!("no stub emitter configured; set [collaborators.emitter] in toolchain.toml"))?;

    match Interop::new(&indexer, &emitter).run_reporting(flavor, &args, &options) {
        Ok(InteropOutput::Emitted(flags)) => {
            for flag in flags {
                println!("{}", flag);
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(InteropOutput::Packaged(path)) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            diagnostic::emit(&err.to_diagnostic(), std::io::stderr().is_terminal());
            Ok(ExitCode::FAILURE)
        }
    }
}
