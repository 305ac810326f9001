//! Bounded, subscribable log of connection and action events.
//!
//! The log is what a control panel shows the user ("Client connected",
//! "click left", "key ctrl+c").  It is separate from `tracing` output, which
//! is for developers, but every entry is mirrored to `tracing` as well.
//!
//! # Readers never block writers (for beginners)
//!
//! Writers append under a short `Mutex` section.  Readers have two options:
//!
//! - [`EventLog::snapshot`] clones the buffer and releases the lock at once,
//!   so a slow reader cannot stall request handlers.
//! - [`EventLog::subscribe`] returns a `tokio::sync::broadcast` receiver that
//!   sees every new entry.  A receiver that falls behind gets `Lagged` and
//!   skips ahead; it never slows down the writers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Capacity of the broadcast channel handed to subscribers.
const BROADCAST_CAPACITY: usize = 256;

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

/// One immutable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
}

/// Append-only ring buffer of [`LogEntry`] values plus a live feed.
pub struct EventLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    feed: broadcast::Sender<LogEntry>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl EventLog {
    /// Creates a log that keeps at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (feed, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            feed,
        }
    }

    /// Appends an entry, evicting the oldest one when full, and returns it.
    pub fn record(&self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            timestamp_ms: unix_millis(),
            level,
            message: message.into(),
        };

        match level {
            LogLevel::Debug => debug!(target: "trackpad::events", "{}", entry.message),
            LogLevel::Info => info!(target: "trackpad::events", "{}", entry.message),
            LogLevel::Warn => warn!(target: "trackpad::events", "{}", entry.message),
            LogLevel::Error => error!(target: "trackpad::events", "{}", entry.message),
        }

        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        // No subscribers is not an error.
        let _ = self.feed.send(entry.clone());
        entry
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.record(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> LogEntry {
        self.record(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.record(LogLevel::Error, message)
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    /// Live feed of entries recorded after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.feed.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
