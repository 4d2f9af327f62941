//! Command orchestration for CLI subcommands.
//!
//! Provides execute functions for:
//! - `replay` - Classify recorded frames
//! - `config` - Print the effective gate configuration
//! - `knock` - Send a knock (the `knock` binary)

pub mod config;
pub mod knock;
pub mod replay;

pub use config::execute_config;
pub use knock::{execute_knock, send_knock, KnockError};
pub use replay::{execute_replay, ReplayResult};

use crate::cli::CliError;
use knockgate_core::ConfigError;
use knockgate_schema::SchemaError;
use thiserror::Error;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay input line {line}: {source}")]
    Replay { line: usize, source: SchemaError },

    #[error("knock failed: {0}")]
    Knock(#[from] KnockError),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
