//! The decision log.
//!
//! A [`TelemetrySink`] keeps every [`DecisionRecord`] appended during a
//! session in insertion order until it is cleared.

use serde::Serialize;
use std::time::Duration;
use waypoint_core::{DecisionRecord, Level};

/// Per-level record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// All records.
    pub total: usize,
    /// Error-level records.
    pub errors: usize,
    /// Warning-level records.
    pub warnings: usize,
    /// Success-level records.
    pub successes: usize,
    /// Informational records.
    pub infos: usize,
}

impl LogStats {
    fn count(&mut self, level: Level) {
        self.total += 1;
        match level {
            Level::Error => self.errors += 1,
            Level::Warning => self.warnings += 1,
            Level::Success => self.successes += 1,
            Level::Info => self.infos += 1,
        }
    }
}

/// Ordered, append-only decision log.
#[derive(Debug, Default)]
pub struct TelemetrySink {
    records: Vec<DecisionRecord>,
    stats: LogStats,
    last_execution: Option<Duration>,
}

impl TelemetrySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record.
    pub fn append(&mut self, record: DecisionRecord) {
        self.stats.count(record.level);
        self.records.push(record);
    }

    /// Appends records in order.
    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = DecisionRecord>,
    {
        for record in records {
            self.append(record);
        }
    }

    /// Returns the records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Empties the log and resets its counters.
    pub fn clear(&mut self) {
        self.records.clear();
        self.stats = LogStats::default();
        self.last_execution = None;
    }

    /// Returns per-level counts.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        self.stats
    }

    /// Records how long the latest pipeline pass took.
    pub fn set_last_execution(&mut self, elapsed: Duration) {
        self.last_execution = Some(elapsed);
    }

    /// Duration of the latest pipeline pass, if any ran since the last clear.
    #[must_use]
    pub fn last_execution(&self) -> Option<Duration> {
        self.last_execution
    }

    /// Serializes the log to plain text.
    ///
    /// Each record becomes `[HH:MM:SS] [Stage] icon message`, followed by
    /// `\n  → details` when the record has details. Records are separated by
    /// a blank line.
    ///
    /// ```
    /// use waypoint_core::{DecisionRecord, Level, StageName};
    /// use waypoint_telemetry::TelemetrySink;
    ///
    /// let mut sink = TelemetrySink::new();
    /// sink.append(
    ///     DecisionRecord::new(StageName::RateLimit, Level::Success, "✅", "Within limit")
    ///         .with_details("Requests: 1/10"),
    /// );
    ///
    /// let text = sink.export();
    /// assert!(text.ends_with("[Rate Limiting] ✅ Within limit\n  → Requests: 1/10"));
    /// ```
    #[must_use]
    pub fn export(&self) -> String {
        self.records
            .iter()
            .map(format_entry)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn format_entry(record: &DecisionRecord) -> String {
    let mut entry = format!(
        "[{}] [{}] {} {}",
        record.timestamp.format("%H:%M:%S"),
        record.stage,
        record.icon,
        record.message
    );
    if let Some(details) = &record.details {
        entry.push_str("\n  → ");
        entry.push_str(details);
    }
    entry
}

/// File name offered for a log download.
#[must_use]
pub fn export_file_name(unix_millis: i64) -> String {
    format!("middleware-logs-{unix_millis}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use waypoint_core::StageName;

    fn record(stage: StageName, level: Level, message: &str) -> DecisionRecord {
        let mut record = DecisionRecord::new(stage, level, "•", message);
        record.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 4, 7).unwrap();
        record
    }

    #[test]
    fn test_append_keeps_order() {
        let mut sink = TelemetrySink::new();
        sink.append(record(StageName::RateLimit, Level::Success, "a"));
        sink.append(record(StageName::Maintenance, Level::Info, "b"));

        let messages: Vec<_> = sink.records().iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["a", "b"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_stats() {
        let mut sink = TelemetrySink::new();
        sink.extend([
            record(StageName::RateLimit, Level::Success, "ok"),
            record(StageName::Geolocation, Level::Info, "geo"),
            record(StageName::ProtectedRoutes, Level::Warning, "redirect"),
            record(StageName::AdminRoutes, Level::Error, "denied"),
            record(StageName::Response, Level::Success, "served"),
        ]);

        let stats = sink.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.warnings, 1);
        assert_eq!(stats.infos, 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut sink = TelemetrySink::new();
        sink.append(record(StageName::RateLimit, Level::Error, "blocked"));
        sink.set_last_execution(Duration::from_millis(3));

        sink.clear();

        assert!(sink.is_empty());
        assert_eq!(sink.stats(), LogStats::default());
        assert!(sink.last_execution().is_none());
    }

    #[test]
    fn test_export_format() {
        let mut sink = TelemetrySink::new();
        sink.append(record(StageName::PublicRoutes, Level::Info, "Public route").with_details("No auth needed"));
        sink.append(record(StageName::SecurityHeaders, Level::Success, "Headers added"));

        assert_eq!(
            sink.export(),
            "[09:04:07] [Public Routes] • Public route\n  → No auth needed\n\n\
             [09:04:07] [Security Headers] • Headers added"
        );
    }

    #[test]
    fn test_export_empty() {
        assert_eq!(TelemetrySink::new().export(), "");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(1_700_000_000_000), "middleware-logs-1700000000000.txt");
    }
}
