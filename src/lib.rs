//! Declarative manifest engine.
//!
//! A manifest declares an ordered list of recipes and a deep-merged
//! configuration.  Executing it runs every recipe once, collects the
//! resources they describe and hands them to an apply backend, either for
//! real or in noop mode.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: deep-merged configuration tables and TOML manifest files
//! - **[`template`]**: ERB-style text templates rendered from a binding table
//! - **[`resources`]**: resource descriptors, the per-manifest ledger and local providers
//! - **[`manifest`]**: manifest types, instances and the execute/noop protocol
//! - **[`backend`]**: the seam that enacts resources, with a local implementation
//! - **[`commands`]**: top-level subcommand orchestration (`apply`, `plan`, `recipes`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod manifest;
pub mod operations;
pub mod resources;
pub mod template;
