//! Core library for the `wavefront` orchestration CLI.
//!
//! A unit of work moves through a fixed sequence of phases (brainstorm,
//! specify, clarify, architecture, decompose, execute). During execute, tasks
//! run in numbered waves and each wave must pass a quality gate before the
//! next one may start. All state lives in one JSON task graph guarded by an
//! advisory lock file, so concurrent hook invocations stay consistent.

pub mod adapters;
pub mod admission;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod graph;
pub mod logging;
pub mod orchestrator;
pub mod ports;
pub mod review;
pub mod store;
pub mod transition;

#[cfg(test)]
mod testing;

pub use error::Error;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
