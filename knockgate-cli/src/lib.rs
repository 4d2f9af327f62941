//! knockgate command-line tools.
//!
//! This crate provides argument parsing, command orchestration and exit code
//! mapping for the `knockgate` and `knock` binaries.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod logger;

pub use cli::{
    parse_from, parse_knock_from, Cli, CliError, Command, ConfigArgs, GateArgs, KnockCli,
    ReplayArgs, DEFAULT_TIMEOUT_MS,
};
pub use commands::{
    execute_config, execute_knock, execute_replay, send_knock, CommandError, CommandResult,
    KnockError, ReplayResult,
};
pub use logger::{init_tracing, TracingLogger};
