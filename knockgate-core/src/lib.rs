//! knockgate packet classifier.
//!
//! This crate provides:
//! - Bounds-checked Ethernet/IPv4/TCP/UDP header views
//! - The authorization store trait and a sharded in-memory implementation
//! - Knock detection (bare TCP connect or UDP magic payload)
//! - The decision engine that gates SYNs to the protected port
//! - Configuration, diagnostic trace seam and outcome counters

pub mod builder;
pub mod config;
pub mod engine;
pub mod knock;
pub mod packet;
pub mod stats;
pub mod store;
pub mod trace;

pub use builder::FrameBuilder;
pub use config::{
    parse_magic, ConfigError, GateConfig, DEFAULT_EXPIRE_SECS, DEFAULT_PROTECTED_PORT,
    DEFAULT_SENTINEL_PORT, DEFAULT_UDP_MAGIC,
};
pub use engine::{AuthState, Classifier, Decision, Reason, Verdict};
pub use knock::{KnockDetector, KnockMechanism, MAGIC_LEN};
pub use packet::{parse_frame, Layer, Packet, ParseError, Transport};
pub use stats::{EngineStats, StatsSnapshot};
pub use store::{AuthStore, AuthorizationEntry, ShardedStore, StoreError, DEFAULT_CAPACITY};
pub use trace::{LogEntry, Logger, MockLogger, NullLogger, Verbosity};
