//! Per-outcome classification counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::engine::{Decision, Reason, Verdict};

/// Counters updated on every classification.
///
/// Relaxed atomics: counters are independent and only read for reporting.
#[derive(Debug, Default)]
pub struct EngineStats {
    frames: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    malformed: AtomicU64,
    knocks_recorded: AtomicU64,
    knocks_rejected: AtomicU64,
    authorized: AtomicU64,
    no_entry: AtomicU64,
    expired: AtomicU64,
    store_errors: AtomicU64,
    swept: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames: u64,
    pub accepted: u64,
    pub dropped: u64,
    pub malformed: u64,
    pub knocks_recorded: u64,
    pub knocks_rejected: u64,
    pub authorized: u64,
    pub no_entry: u64,
    pub expired: u64,
    pub store_errors: u64,
    pub swept: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified frame.
    pub fn record(&self, decision: &Decision) {
        bump(&self.frames);
        match decision.verdict {
            Verdict::Accept => bump(&self.accepted),
            Verdict::Drop => bump(&self.dropped),
        }
        match decision.reason {
            Reason::MalformedHeader => bump(&self.malformed),
            Reason::KnockRecorded => bump(&self.knocks_recorded),
            Reason::KnockRejected => bump(&self.knocks_rejected),
            Reason::Authorized => bump(&self.authorized),
            Reason::NoEntry => bump(&self.no_entry),
            Reason::Expired => bump(&self.expired),
            Reason::StoreError => bump(&self.store_errors),
            Reason::NotIpv4
            | Reason::UntrackedProtocol
            | Reason::UninspectableTransport
            | Reason::NotSyn
            | Reason::NotGated => {}
        }
    }

    /// Count entries removed by a sweep.
    pub fn record_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames: load(&self.frames),
            accepted: load(&self.accepted),
            dropped: load(&self.dropped),
            malformed: load(&self.malformed),
            knocks_recorded: load(&self.knocks_recorded),
            knocks_rejected: load(&self.knocks_rejected),
            authorized: load(&self.authorized),
            no_entry: load(&self.no_entry),
            expired: load(&self.expired),
            store_errors: load(&self.store_errors),
            swept: load(&self.swept),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(verdict: Verdict, reason: Reason) -> Decision {
        Decision {
            verdict,
            reason,
            source: None,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(EngineStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_record_counts_verdicts_and_reasons() {
        let stats = EngineStats::new();
        stats.record(&decision(Verdict::Accept, Reason::KnockRecorded));
        stats.record(&decision(Verdict::Drop, Reason::NoEntry));
        stats.record(&decision(Verdict::Drop, Reason::Expired));
        stats.record(&decision(Verdict::Accept, Reason::NotGated));

        let snap = stats.snapshot();
        assert_eq!(snap.frames, 4);
        assert_eq!(snap.accepted, 2);
        assert_eq!(snap.dropped, 2);
        assert_eq!(snap.knocks_recorded, 1);
        assert_eq!(snap.no_entry, 1);
        assert_eq!(snap.expired, 1);
        assert_eq!(snap.authorized, 0);
    }

    #[test]
    fn test_record_swept() {
        let stats = EngineStats::new();
        stats.record_swept(3);
        stats.record_swept(0);
        assert_eq!(stats.snapshot().swept, 3);
        assert_eq!(stats.snapshot().frames, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&StatsSnapshot::default()).expect("serialize");
        assert!(json.starts_with("{\"frames\":0"));
    }
}
