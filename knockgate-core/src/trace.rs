//! Diagnostic trace seam.
//!
//! The classifier reports knocks, lookup misses and expiries through the
//! `Logger` trait. Production binaries forward to their logging backend;
//! tests capture events with `MockLogger`.

use std::sync::{Arc, RwLock};

/// Verbosity level for trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Always shown.
    Normal,
    /// Shown with -v.
    Verbose,
    /// Shown with -vv.
    Debug,
}

impl Verbosity {
    /// Create verbosity from CLI flag count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Trait for trace output.
///
/// Called from every classification thread, so implementations must be
/// thread-safe and must not block.
pub trait Logger: Send + Sync {
    /// Log a message at the given verbosity level.
    fn log(&self, level: Verbosity, message: &str);

    /// Whether a message at `level` would be recorded.
    ///
    /// Callers on the packet path check this before formatting.
    fn enabled(&self, _level: Verbosity) -> bool {
        true
    }

    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Verbosity, message: &str) {
        (**self).log(level, message);
    }

    fn enabled(&self, level: Verbosity) -> bool {
        (**self).enabled(level)
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    pub fn clear(&self) {
        if let Ok(mut messages) = self.messages.write() {
            messages.clear();
        }
    }

    pub fn count(&self) -> usize {
        self.messages.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if let Ok(mut messages) = self.messages.write() {
            messages.push(LogEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}

    fn enabled(&self, _level: Verbosity) -> bool {
        false
    }
}
