//! CLI module for mrm-status
//!
//! Provides command-line interface for:
//! - init: Write config and create the database
//! - serve: Run the HTTP API
//! - seed-model, create-version: Register models and versions
//! - set-request-status, decline, approve: Validation workflow hooks
//! - activate: Manual activation with supersession
//! - show-version, audit, verify-audit: Inspection

mod args;
mod commands;
mod errors;
mod io;

pub use args::{ActorArgs, Cli, Command};
pub use commands::{execute, init, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
