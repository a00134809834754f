// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded activity log.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Default number of entries kept by an [`EventLog`].
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Category of a log entry, mostly used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Informational message.
    Info,
    /// An operation succeeded.
    Success,
    /// Something unexpected but recoverable.
    Warning,
    /// An operation failed.
    Error,
    /// A structured message that was not recognised, kept verbatim.
    RawStructured,
}

impl LogCategory {
    /// Returns the lowercase name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::RawStructured => "raw_structured",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Human-readable message.
    pub message: String,
    /// Entry category.
    pub category: LogCategory,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(message: impl Into<String>, category: LogCategory) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            category,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.category,
            self.message
        )
    }
}

/// A fixed-capacity FIFO of [`LogEntry`].
///
/// When full, the oldest entry is evicted before a new one is appended. The
/// log is purely observational: nothing reads it to make control decisions.
/// Each entry is also emitted as a `tracing` event at a matching level.
///
/// # Examples
///
/// ```
/// use laserctl_lib::event::{EventLog, LogCategory};
///
/// let log = EventLog::with_capacity(2);
/// log.append("one", LogCategory::Info);
/// log.append("two", LogCategory::Info);
/// log.append("three", LogCategory::Success);
///
/// let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
/// assert_eq!(messages, vec!["two", "three"]);
/// ```
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates a log holding [`DEFAULT_LOG_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Creates a log holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest one when full.
    ///
    /// Returns the stored entry.
    pub fn append(&self, message: impl Into<String>, category: LogCategory) -> LogEntry {
        let entry = LogEntry::new(message, category);
        trace_entry(&entry);

        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Returns a snapshot of all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn trace_entry(entry: &LogEntry) {
    match entry.category {
        LogCategory::Info | LogCategory::Success => {
            tracing::info!(category = %entry.category, "{}", entry.message);
        }
        LogCategory::Warning => tracing::warn!("{}", entry.message),
        LogCategory::Error => tracing::error!("{}", entry.message),
        LogCategory::RawStructured => tracing::debug!(raw = %entry.message, "Unrecognized report"),
    }
}
