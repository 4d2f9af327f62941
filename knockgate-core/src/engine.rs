//! Decision engine.
//!
//! `Classifier` turns one frame into one verdict. Only the connection
//! initiation to the protected port is gated; everything else is accepted,
//! except frames whose link or network header cannot be read.
//!
//! Authorization state is derived from the store on every lookup:
//!
//! ```text
//!   Unknown  --knock-->  Authorized  --window elapses-->  Expired
//!      ^                     ^  |                            |
//!      |                     +--+ knock (refresh)            |
//!      +------------- deleted on next protected SYN ---------+
//! ```

use std::net::Ipv4Addr;

use knockgate_clock::Clock;
use serde::Serialize;

use crate::config::{ConfigError, GateConfig};
use crate::knock::KnockDetector;
use crate::packet::{parse_frame, Packet, TcpHeader, Transport, UdpDatagram};
use crate::stats::{EngineStats, StatsSnapshot};
use crate::store::{AuthStore, ShardedStore};
use crate::trace::{Logger, Verbosity};

/// What the host does with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Continue normal processing.
    Accept,
    /// Discard the frame.
    Drop,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Drop => "DROP",
        }
    }
}

/// Which branch of the classifier produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Link or network header unreadable (drop).
    MalformedHeader,
    /// Not an IPv4 frame (accept).
    NotIpv4,
    /// Transport protocol other than TCP/UDP (accept).
    UntrackedProtocol,
    /// Transport header unreadable (accept).
    UninspectableTransport,
    /// Knock recognized and stored (accept).
    KnockRecorded,
    /// Knock recognized but the store refused it (accept).
    KnockRejected,
    /// TCP segment without SYN (accept).
    NotSyn,
    /// Traffic to a port that is neither gated nor a knock (accept).
    NotGated,
    /// Protected-port SYN within the window (accept).
    Authorized,
    /// Protected-port SYN from an unknown source (drop).
    NoEntry,
    /// Protected-port SYN after the window closed (drop).
    Expired,
    /// Protected-port SYN whose lookup failed (drop).
    StoreError,
}

impl Reason {
    /// Stable snake_case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MalformedHeader => "malformed_header",
            Reason::NotIpv4 => "not_ipv4",
            Reason::UntrackedProtocol => "untracked_protocol",
            Reason::UninspectableTransport => "uninspectable_transport",
            Reason::KnockRecorded => "knock_recorded",
            Reason::KnockRejected => "knock_rejected",
            Reason::NotSyn => "not_syn",
            Reason::NotGated => "not_gated",
            Reason::Authorized => "authorized",
            Reason::NoEntry => "no_entry",
            Reason::Expired => "expired",
            Reason::StoreError => "store_error",
        }
    }
}

/// Classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Reason,
    /// IPv4 source address, when the network header was readable.
    pub source: Option<u32>,
}

impl Decision {
    pub fn accepted(reason: Reason, source: Option<u32>) -> Self {
        Self {
            verdict: Verdict::Accept,
            reason,
            source,
        }
    }

    pub fn dropped(reason: Reason, source: Option<u32>) -> Self {
        Self {
            verdict: Verdict::Drop,
            reason,
            source,
        }
    }

    pub fn is_accept(&self) -> bool {
        self.verdict == Verdict::Accept
    }
}

/// Authorization state of one source at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    Authorized { knocked_at_ns: u64 },
    Expired { knocked_at_ns: u64 },
}

impl AuthState {
    /// Derive the state from a store entry.
    ///
    /// A knock timestamp later than `now_ns` (written concurrently after
    /// `now_ns` was read) counts as zero elapsed time.
    pub fn evaluate(knocked_at_ns: Option<u64>, now_ns: u64, window_ns: u64) -> Self {
        match knocked_at_ns {
            None => AuthState::Unknown,
            Some(ts) if now_ns.saturating_sub(ts) <= window_ns => {
                AuthState::Authorized { knocked_at_ns: ts }
            }
            Some(ts) => AuthState::Expired { knocked_at_ns: ts },
        }
    }
}

/// Port-knock packet classifier.
///
/// `classify` takes `&self` and is safe to call from many threads at once;
/// all shared state lives in the store and in atomic counters.
pub struct Classifier<S, C, L> {
    config: GateConfig,
    detector: KnockDetector,
    window_ns: u64,
    store: S,
    clock: C,
    logger: L,
    stats: EngineStats,
}

impl<C, L> Classifier<ShardedStore, C, L>
where
    C: Clock,
    L: Logger,
{
    /// Build a classifier with an in-memory store sized from `config`.
    pub fn from_config(config: GateConfig, clock: C, logger: L) -> Result<Self, ConfigError> {
        let store = ShardedStore::with_capacity(config.capacity);
        Self::new(config, store, clock, logger)
    }
}

impl<S, C, L> Classifier<S, C, L>
where
    S: AuthStore,
    C: Clock,
    L: Logger,
{
    /// Create a classifier after validating `config`.
    pub fn new(config: GateConfig, store: S, clock: C, logger: L) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            detector: KnockDetector::new(config.sentinel_port, config.mechanism),
            window_ns: config.expire_window_ns(),
            config,
            store,
            clock,
            logger,
            stats: EngineStats::new(),
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Classify one ingress frame.
    pub fn classify(&self, frame: &[u8]) -> Decision {
        let decision = self.decide(frame);
        self.stats.record(&decision);
        decision
    }

    fn decide(&self, frame: &[u8]) -> Decision {
        let packet = match parse_frame(frame) {
            Ok(packet) => packet,
            Err(e) => {
                self.trace(Verbosity::Debug, || format!("Malformed frame: {}", e));
                return Decision::dropped(Reason::MalformedHeader, None);
            }
        };

        let (ip, transport) = match packet {
            Packet::NonIpv4 { .. } => return Decision::accepted(Reason::NotIpv4, None),
            Packet::Ipv4 { ip, transport } => (ip, transport),
        };
        let source = ip.source();

        match transport {
            Ok(Transport::Tcp(tcp)) => self.handle_tcp(source, &tcp),
            Ok(Transport::Udp(udp)) => self.handle_udp(source, &udp),
            Ok(Transport::Other(_)) => Decision::accepted(Reason::UntrackedProtocol, Some(source)),
            Err(_) => Decision::accepted(Reason::UninspectableTransport, Some(source)),
        }
    }

    fn handle_tcp(&self, source: u32, tcp: &TcpHeader<'_>) -> Decision {
        if !tcp.is_syn() {
            return Decision::accepted(Reason::NotSyn, Some(source));
        }
        if self.detector.is_tcp_knock(tcp) {
            return self.knock(source);
        }
        if tcp.dest_port() != self.config.protected_port {
            return Decision::accepted(Reason::NotGated, Some(source));
        }
        self.evaluate_syn(source)
    }

    fn handle_udp(&self, source: u32, udp: &UdpDatagram<'_>) -> Decision {
        if self.detector.is_udp_knock(udp) {
            self.knock(source)
        } else {
            Decision::accepted(Reason::NotGated, Some(source))
        }
    }

    fn knock(&self, source: u32) -> Decision {
        let now = self.clock.now_ns();
        match self.detector.record(&self.store, &self.logger, source, now) {
            Ok(()) => Decision::accepted(Reason::KnockRecorded, Some(source)),
            Err(_) => Decision::accepted(Reason::KnockRejected, Some(source)),
        }
    }

    /// Gate a connection attempt from `source` to the protected port.
    ///
    /// Never creates an entry. An expired entry is deleted here; there is no
    /// background timer.
    pub fn evaluate_syn(&self, source: u32) -> Decision {
        let now = self.clock.now_ns();
        let knocked_at = match self.store.lookup(source) {
            Ok(knocked_at) => knocked_at,
            Err(e) => {
                self.trace(Verbosity::Normal, || {
                    format!("Lookup for {} failed: {}", Ipv4Addr::from(source), e)
                });
                return Decision::dropped(Reason::StoreError, Some(source));
            }
        };

        match AuthState::evaluate(knocked_at, now, self.window_ns) {
            AuthState::Unknown => {
                self.trace(Verbosity::Debug, || {
                    format!("No entry for {}", Ipv4Addr::from(source))
                });
                Decision::dropped(Reason::NoEntry, Some(source))
            }
            AuthState::Authorized { .. } => {
                self.trace(Verbosity::Debug, || {
                    format!("Found entry for {}", Ipv4Addr::from(source))
                });
                Decision::accepted(Reason::Authorized, Some(source))
            }
            AuthState::Expired { knocked_at_ns } => {
                if let Err(e) = self.store.delete(source, knocked_at_ns) {
                    self.trace(Verbosity::Normal, || {
                        format!("Delete for {} failed: {}", Ipv4Addr::from(source), e)
                    });
                }
                self.trace(Verbosity::Debug, || {
                    format!("Expired entry for {}", Ipv4Addr::from(source))
                });
                Decision::dropped(Reason::Expired, Some(source))
            }
        }
    }

    /// Remove every expired entry. Returns the number removed.
    ///
    /// Optional hygiene for long-running hosts; verdicts are the same with or
    /// without it.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ns();
        let window_ns = self.window_ns;
        let result = self.store.retain(&mut |_, knocked_at| {
            !matches!(
                AuthState::evaluate(Some(knocked_at), now, window_ns),
                AuthState::Expired { .. }
            )
        });
        match result {
            Ok(removed) => {
                self.stats.record_swept(removed);
                if removed > 0 {
                    self.trace(Verbosity::Verbose, || {
                        format!("Swept {} expired entries", removed)
                    });
                }
                removed
            }
            Err(e) => {
                self.trace(Verbosity::Normal, || format!("Sweep failed: {}", e));
                0
            }
        }
    }

    fn trace(&self, level: Verbosity, message: impl FnOnce() -> String) {
        if self.logger.enabled(level) {
            self.logger.log(level, &message());
        }
    }
}
