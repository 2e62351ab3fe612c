//! pagecheck CLI library
//!
//! Argument parsing, config files, console output, logging setup and the
//! `--serve` static server around the `pagecheck` harness.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;
mod serve;

pub use commands::{Cli, ColorArg, WaitArg};
pub use config::{ChecksRef, CliConfig, ColorChoice, HarnessConfig, Verbosity};
pub use error::{CliError, CliResult, EXIT_FAIL, EXIT_FATAL, EXIT_PASS};
pub use output::ProgressReporter;
pub use runner::{execute, finish_run, render_presets, run_scenarios, RunPlan, DEFAULT_OUT_DIR};
pub use serve::StaticServer;
