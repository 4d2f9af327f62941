//! Knock recognition.
//!
//! Exactly one mechanism is active per deployment. Both share the same
//! effect: the knocking source's authorization entry is created or
//! refreshed with the current time.

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::packet::{TcpHeader, UdpDatagram};
use crate::store::{AuthStore, StoreError};
use crate::trace::{Logger, Verbosity};

/// Length of a magic-payload knock.
pub const MAGIC_LEN: usize = 4;

/// How a source announces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KnockMechanism {
    /// A TCP SYN to the sentinel port.
    BareConnect,
    /// A UDP datagram to the sentinel port whose payload is exactly the
    /// 4-byte magic value in network byte order.
    MagicDatagram { magic: u32 },
}

/// Recognizes knocks and records them in the authorization store.
#[derive(Debug, Clone, Copy)]
pub struct KnockDetector {
    sentinel_port: u16,
    mechanism: KnockMechanism,
}

impl KnockDetector {
    pub fn new(sentinel_port: u16, mechanism: KnockMechanism) -> Self {
        Self {
            sentinel_port,
            mechanism,
        }
    }

    pub fn sentinel_port(&self) -> u16 {
        self.sentinel_port
    }

    pub fn mechanism(&self) -> KnockMechanism {
        self.mechanism
    }

    /// Whether UDP traffic is inspected at all.
    pub fn inspects_udp(&self) -> bool {
        matches!(self.mechanism, KnockMechanism::MagicDatagram { .. })
    }

    /// Whether a TCP segment is a bare-connection knock.
    pub fn is_tcp_knock(&self, tcp: &TcpHeader<'_>) -> bool {
        self.mechanism == KnockMechanism::BareConnect
            && tcp.is_syn()
            && tcp.dest_port() == self.sentinel_port
    }

    /// Whether a UDP datagram is a magic-payload knock.
    ///
    /// The datagram must declare exactly [`MAGIC_LEN`] payload bytes and all
    /// of them must be present in the frame.
    pub fn is_udp_knock(&self, udp: &UdpDatagram<'_>) -> bool {
        let KnockMechanism::MagicDatagram { magic } = self.mechanism else {
            return false;
        };
        udp.dest_port() == self.sentinel_port
            && udp.declared_payload_len() == MAGIC_LEN
            && udp.payload() == magic.to_be_bytes()
    }

    /// Record a knock from `source` at `now_ns`.
    ///
    /// A failed write is traced and returned; the knock itself is never
    /// blocked, so callers still accept the packet.
    pub fn record<S, L>(
        &self,
        store: &S,
        logger: &L,
        source: u32,
        now_ns: u64,
    ) -> Result<(), StoreError>
    where
        S: AuthStore + ?Sized,
        L: Logger + ?Sized,
    {
        match store.insert(source, now_ns) {
            Ok(()) => {
                if logger.enabled(Verbosity::Verbose) {
                    logger.verbose(&format!(
                        "Knock on port {} from {}",
                        self.sentinel_port,
                        Ipv4Addr::from(source)
                    ));
                }
                Ok(())
            }
            Err(e) => {
                if logger.enabled(Verbosity::Normal) {
                    logger.info(&format!(
                        "Knock from {} not recorded: {}",
                        Ipv4Addr::from(source),
                        e
                    ));
                }
                Err(e)
            }
        }
    }
}
