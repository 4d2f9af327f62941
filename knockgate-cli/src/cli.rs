//! CLI argument parsing for knockgate.
//!
//! Two binaries share this module: `knockgate` (frame replay and config
//! inspection) and `knock` (the client that announces a source to a gate).

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use knockgate_core::{
    parse_magic, GateConfig, DEFAULT_CAPACITY, DEFAULT_EXPIRE_SECS, DEFAULT_PROTECTED_PORT,
    DEFAULT_SENTINEL_PORT,
};
use thiserror::Error;

/// Default connect timeout for the knock client in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("sweep-every must be at least 1, got {0}")]
    InvalidSweepEvery(u64),

    #[error("timeout-ms must be at least 1, got {0}")]
    InvalidTimeout(u64),
}

/// knockgate - port-knock gate classifier for a protected TCP service.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "knockgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Classify recorded frames and emit one verdict per frame.
    Replay(ReplayArgs),
    /// Print the effective gate configuration as JSON.
    Config(ConfigArgs),
}

/// Gate settings shared by every command that builds a classifier.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GateArgs {
    /// Port that receives knocks.
    #[arg(long, default_value_t = DEFAULT_SENTINEL_PORT)]
    pub sentinel_port: u16,

    /// Port whose connection attempts are gated.
    #[arg(long, default_value_t = DEFAULT_PROTECTED_PORT)]
    pub protected_port: u16,

    /// Authorization window in seconds.
    #[arg(long = "expire-sec", default_value_t = DEFAULT_EXPIRE_SECS)]
    pub expire_secs: u64,

    /// Expect UDP knocks carrying this 4-byte value (decimal or 0x hex)
    /// instead of bare TCP connects.
    #[arg(long, value_parser = magic_value)]
    pub magic: Option<u32>,

    /// Maximum number of tracked sources.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
}

impl GateArgs {
    /// Build the gate configuration. Validation happens in the classifier.
    pub fn to_gate_config(&self) -> GateConfig {
        let config = GateConfig::default()
            .with_sentinel_port(self.sentinel_port)
            .with_protected_port(self.protected_port)
            .with_expire_secs(self.expire_secs)
            .with_capacity(self.capacity);
        match self.magic {
            Some(magic) => config.with_udp_magic(magic),
            None => config,
        }
    }
}

/// Arguments for the replay command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct ReplayArgs {
    /// JSONL file of frame records (required).
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Write verdict records here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Remove expired entries every N frames.
    #[arg(long)]
    pub sweep_every: Option<u64>,

    #[command(flatten)]
    pub gate: GateArgs,
}

impl ReplayArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.sweep_every == Some(0) {
            return Err(CliError::InvalidSweepEvery(0));
        }
        Ok(())
    }
}

/// Arguments for the config command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub gate: GateArgs,
}

/// knock - announce this host to a knockgate-protected server.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "knock")]
#[command(version, about, long_about = None)]
pub struct KnockCli {
    /// Destination IPv4 address in dotted-decimal notation.
    pub target: Ipv4Addr,

    /// Sentinel port on the destination.
    #[arg(short, long, default_value_t = DEFAULT_SENTINEL_PORT)]
    pub port: u16,

    /// Send a UDP datagram carrying this 4-byte value (decimal or 0x hex)
    /// instead of opening a TCP connection.
    #[arg(long, value_parser = magic_value)]
    pub magic: Option<u32>,

    /// TCP connect timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

impl KnockCli {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.timeout_ms == 0 {
            return Err(CliError::InvalidTimeout(self.timeout_ms));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn magic_value(s: &str) -> Result<u32, String> {
    parse_magic(s).map_err(|e| e.to_string())
}

/// Parse CLI arguments from an iterator (for testing).
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

/// Parse knock client arguments from an iterator (for testing).
pub fn parse_knock_from<I, T>(iter: I) -> Result<KnockCli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    KnockCli::try_parse_from(iter)
}
