//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the manifest engine.
#[derive(Parser, Debug)]
#[command(
    name = "marionette",
    about = "Apply declarative manifests of ordered recipes",
    version
)]
pub struct Cli {
    #[allow(missing_docs)]
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Extra TOML configuration merged over the manifest's (repeatable, later files win)
    #[arg(short, long = "config", value_name = "FILE", global = true)]
    pub configs: Vec<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a manifest and apply its resources
    Apply(ManifestOpts),
    /// Execute a manifest in noop mode and show what would change
    Plan(ManifestOpts),
    /// List a manifest's recipes in execution order
    Recipes(ManifestOpts),
    /// Print version information
    Version,
}

/// Options for commands operating on one manifest file.
#[derive(Parser, Debug, Clone)]
pub struct ManifestOpts {
    /// Path to the manifest file
    pub manifest: PathBuf,
}
