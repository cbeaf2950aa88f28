//! Session log stream.
//!
//! The log stream is the human-readable narrative of a run. It is
//! append-only while a run is in flight and is reset when a new run
//! starts or the session is reset.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Message shown when a session has no run yet
pub const INITIAL_MESSAGE: &str = "System initialized. Waiting for target configuration...";

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        };
        f.write_str(label)
    }
}

/// A single immutable entry in the log stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Capture time
    pub timestamp: DateTime<Local>,

    /// Severity
    pub level: LogLevel,

    /// Human-readable message
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// Wall-clock label used by terminal presentation (`HH:MM:SS`)
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:<7} {}", self.time_label(), self.level, self.message)
    }
}

/// Ordered, append-only sequence of log entries for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogStream {
    entries: Vec<LogEntry>,
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStream {
    /// Create a stream holding only the initial entry
    pub fn new() -> Self {
        Self {
            entries: vec![LogEntry::new(LogLevel::Info, INITIAL_MESSAGE)],
        }
    }

    /// Append one entry stamped with the current time
    pub fn append(&mut self, message: impl Into<String>, level: LogLevel) {
        self.entries.push(LogEntry::new(level, message));
    }

    /// Drop every entry. Used when a new run begins, before its first entry.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with the given level
    pub fn with_level(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stream_has_initial_entry() {
        let stream = LogStream::new();

        assert_eq!(stream.len(), 1);
        assert_eq!(stream.entries()[0].level, LogLevel::Info);
        assert_eq!(stream.entries()[0].message, INITIAL_MESSAGE);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut stream = LogStream::new();
        stream.append("first", LogLevel::Info);
        stream.append("second", LogLevel::Warn);
        stream.append("third", LogLevel::Success);

        let messages: Vec<_> = stream.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec![INITIAL_MESSAGE, "first", "second", "third"]);
        assert_eq!(stream.with_level(LogLevel::Warn).count(), 1);
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let json = serde_json::to_string(&LogLevel::Success).unwrap();
        assert_eq!(json, "\"SUCCESS\"");
    }
}
