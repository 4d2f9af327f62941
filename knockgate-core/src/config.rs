//! Classifier configuration.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::knock::KnockMechanism;
use crate::store::DEFAULT_CAPACITY;

/// Default port that receives knocks.
pub const DEFAULT_SENTINEL_PORT: u16 = 0;

/// Default port of the gated service (SSH).
pub const DEFAULT_PROTECTED_PORT: u16 = 22;

/// Default authorization window in seconds.
pub const DEFAULT_EXPIRE_SECS: u64 = 60;

/// Magic value conventionally used for UDP knocks.
pub const DEFAULT_UDP_MAGIC: u32 = 0xdead_beef;

/// Errors from configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sentinel port and protected port must differ, both are {0}")]
    PortCollision(u16),

    #[error("protected port must be between 1 and 65535, got 0")]
    InvalidProtectedPort,

    #[error("expiry window must be at least 1 second, got {0}")]
    InvalidExpiry(u64),

    #[error("store capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid magic value '{0}': expected decimal or 0x-prefixed hex u32")]
    InvalidMagic(String),
}

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateConfig {
    pub sentinel_port: u16,
    pub protected_port: u16,
    pub expire_secs: u64,
    pub mechanism: KnockMechanism,
    pub capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sentinel_port: DEFAULT_SENTINEL_PORT,
            protected_port: DEFAULT_PROTECTED_PORT,
            expire_secs: DEFAULT_EXPIRE_SECS,
            mechanism: KnockMechanism::BareConnect,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl GateConfig {
    /// Builder: set sentinel_port.
    pub fn with_sentinel_port(mut self, port: u16) -> Self {
        self.sentinel_port = port;
        self
    }

    /// Builder: set protected_port.
    pub fn with_protected_port(mut self, port: u16) -> Self {
        self.protected_port = port;
        self
    }

    /// Builder: set expire_secs.
    pub fn with_expire_secs(mut self, secs: u64) -> Self {
        self.expire_secs = secs;
        self
    }

    /// Builder: set the knock mechanism.
    pub fn with_mechanism(mut self, mechanism: KnockMechanism) -> Self {
        self.mechanism = mechanism;
        self
    }

    /// Builder: switch to UDP magic-payload knocking.
    pub fn with_udp_magic(self, magic: u32) -> Self {
        self.with_mechanism(KnockMechanism::MagicDatagram { magic })
    }

    /// Builder: set store capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Authorization window as a duration.
    pub fn expire_window(&self) -> Duration {
        Duration::from_secs(self.expire_secs)
    }

    /// Authorization window in nanoseconds, saturating.
    pub fn expire_window_ns(&self) -> u64 {
        u64::try_from(self.expire_window().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protected_port == 0 {
            return Err(ConfigError::InvalidProtectedPort);
        }
        if self.sentinel_port == self.protected_port {
            return Err(ConfigError::PortCollision(self.sentinel_port));
        }
        if self.expire_secs == 0 {
            return Err(ConfigError::InvalidExpiry(self.expire_secs));
        }
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

/// Parse a magic value given as decimal or `0x`-prefixed hex.
pub fn parse_magic(s: &str) -> Result<u32, ConfigError> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|_| ConfigError::InvalidMagic(s.to_string()))
}
