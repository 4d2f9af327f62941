//! Production logger.
//!
//! Forwards classifier trace events to `tracing`. Normal events are emitted
//! at INFO, Verbose at DEBUG and Debug at TRACE, so `-v` and `-vv` (or
//! `RUST_LOG`) select how much of the packet path is visible.

use knockgate_core::{Logger, Verbosity};
use tracing::Level;
use tracing_subscriber::EnvFilter;

const TARGET: &str = "knockgate";

/// Logger that emits through the global `tracing` dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

/// Map a trace verbosity onto a `tracing` level.
pub fn level_for(verbosity: Verbosity) -> Level {
    match verbosity {
        Verbosity::Normal => Level::INFO,
        Verbosity::Verbose => Level::DEBUG,
        Verbosity::Debug => Level::TRACE,
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Verbosity, message: &str) {
        match level {
            Verbosity::Normal => tracing::info!(target: TARGET, "{}", message),
            Verbosity::Verbose => tracing::debug!(target: TARGET, "{}", message),
            Verbosity::Debug => tracing::trace!(target: TARGET, "{}", message),
        }
    }

    fn enabled(&self, level: Verbosity) -> bool {
        match level {
            Verbosity::Normal => tracing::enabled!(target: TARGET, Level::INFO),
            Verbosity::Verbose => tracing::enabled!(target: TARGET, Level::DEBUG),
            Verbosity::Debug => tracing::enabled!(target: TARGET, Level::TRACE),
        }
    }
}

/// Default filter directive for a `-v` count.
pub fn filter_directive(verbosity: Verbosity) -> String {
    format!("{}={}", TARGET, level_for(verbosity).as_str().to_lowercase())
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the `-v` count when set.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    // A second install (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(Verbosity::Normal), Level::INFO);
        assert_eq!(level_for(Verbosity::Verbose), Level::DEBUG);
        assert_eq!(level_for(Verbosity::Debug), Level::TRACE);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(Verbosity::from_count(0)), "knockgate=info");
        assert_eq!(filter_directive(Verbosity::from_count(1)), "knockgate=debug");
        assert_eq!(filter_directive(Verbosity::from_count(5)), "knockgate=trace");
    }

    #[test]
    fn test_disabled_without_subscriber() {
        // No subscriber is installed in this test thread.
        tracing::subscriber::with_default(tracing::subscriber::NoSubscriber::default(), || {
            assert!(!TracingLogger.enabled(Verbosity::Normal));
            TracingLogger.info("dropped");
        });
    }

    #[test]
    fn test_enabled_follows_filter() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter_directive(Verbosity::Verbose)))
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(TracingLogger.enabled(Verbosity::Normal));
            assert!(TracingLogger.enabled(Verbosity::Verbose));
            assert!(!TracingLogger.enabled(Verbosity::Debug));
        });
    }
}
