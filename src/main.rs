//! Command-line entry point for the marionette manifest engine.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use marionette::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Apply(_) => "apply",
        cli::Command::Plan(_) => "plan",
        cli::Command::Recipes(_) => "recipes",
        cli::Command::Version => return commands::version::run(),
    };
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match &args.command {
        cli::Command::Apply(opts) => commands::apply::run(&args.global, opts, &log),
        cli::Command::Plan(opts) => commands::plan::run(&args.global, opts, &log),
        cli::Command::Recipes(opts) => commands::recipes::run(&args.global, opts, &log),
        cli::Command::Version => Ok(()),
    }
}
