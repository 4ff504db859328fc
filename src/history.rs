//! Append-only, timestamped operation log.

use std::fmt::Write;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Default timestamp layout of history lines.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    timestamp: DateTime<Local>,
    message: String,
}

impl HistoryEntry {
    /// Records `message` at the current local time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }

    /// When the operation was recorded.
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// What was recorded.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Formats the entry as `<timestamp> - <message>`.
    ///
    /// An invalid `format` falls back to [`DEFAULT_TIMESTAMP_FORMAT`].
    pub fn line(&self, format: &str) -> String {
        let mut line = String::new();
        if write!(line, "{}", self.timestamp.format(format)).is_err() {
            line.clear();
            let _ = write!(line, "{}", self.timestamp.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        let _ = write!(line, " - {}", self.message);
        line
    }
}

/// Ordered operation log. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// A log holding a single entry.
    pub fn starting_with(message: impl Into<String>) -> Self {
        Self {
            entries: vec![HistoryEntry::now(message)],
        }
    }

    /// Appends a record stamped with the current time.
    pub fn record(&mut self, message: impl Into<String>) {
        self.entries.push(HistoryEntry::now(message));
    }

    /// Entries in recording order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-joined lines of every entry.
    pub fn render(&self, format: &str) -> String {
        self.entries
            .iter()
            .map(|e| e.line(format))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    #[test]
    fn test_line_layout() {
        let entry = HistoryEntry::now("Initiated QA Table");
        let line = entry.line(DEFAULT_TIMESTAMP_FORMAT);
        let (stamp, message) = line.split_once(" - ").unwrap();
        assert_eq!(message, "Initiated QA Table");
        assert!(NaiveDateTime::parse_from_str(stamp, DEFAULT_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_invalid_format_falls_back() {
        let entry = HistoryEntry::now("x");
        let line = entry.line("%Q%");
        let (stamp, _) = line.split_once(" - ").unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, DEFAULT_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut history = History::starting_with("first");
        history.record("second");
        history.record("third");
        let messages: Vec<_> = history.entries().iter().map(|e| e.message()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert!(history.entries()[0].timestamp() <= history.entries()[2].timestamp());
    }

    #[test]
    fn test_render_joins_lines() {
        let mut history = History::starting_with("a");
        history.record("b");
        let rendered = history.render("%H");
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.lines().last().unwrap().ends_with(" - b"));
    }

    #[test]
    fn test_empty() {
        let history = History::default();
        assert!(history.is_empty());
        assert_eq!(history.render(DEFAULT_TIMESTAMP_FORMAT), "");
    }
}
