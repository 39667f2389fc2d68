// crates/entity-store-core/src/logging.rs
// ============================================================================
// Module: Statement Logging
// Description: Structured statement events and pluggable sinks.
// Purpose: Trace generated statements and rollback failures as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! When a store runs with `debug` enabled, every statement it issues is
//! recorded as a [`StatementEvent`] on its [`StatementSink`]. Failed
//! statements are recorded with the backend error. A rollback that fails
//! after an aborted transaction is recorded too, under the same `debug`
//! gate; the caller only sees the original error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Event name for a successfully executed statement.
pub const EVENT_STATEMENT: &str = "statement";
/// Event name for a statement rejected by the backend.
pub const EVENT_STATEMENT_FAILED: &str = "statement_failed";
/// Event name for a rollback that failed after an aborted transaction.
pub const EVENT_ROLLBACK_FAILED: &str = "rollback_failed";

/// Statement log event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Store operation that issued the statement.
    pub operation: &'static str,
    /// Statement text when applicable.
    pub statement: Option<String>,
    /// Error message when the statement or rollback failed.
    pub error: Option<String>,
}

impl StatementEvent {
    /// Builds an event stamped with the current time.
    #[must_use]
    pub fn new(
        event: &'static str,
        operation: &'static str,
        statement: Option<String>,
        error: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            operation,
            statement,
            error,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for statement events.
pub trait StatementSink: Send + Sync {
    /// Records a statement event.
    fn record(&self, event: &StatementEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrStatementSink;

impl StatementSink for StderrStatementSink {
    fn record(&self, event: &StatementEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileStatementSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileStatementSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StatementSink for FileStatementSink {
    fn record(&self, event: &StatementEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that discards events.
pub struct NoopStatementSink;

impl StatementSink for NoopStatementSink {
    fn record(&self, _event: &StatementEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::EVENT_STATEMENT;
    use super::FileStatementSink;
    use super::StatementEvent;
    use super::StatementSink;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statements.log");
        let sink = FileStatementSink::new(&path).unwrap();
        sink.record(&StatementEvent::new(
            EVENT_STATEMENT,
            "entity_create",
            Some("INSERT INTO \"ents\" (\"id\") VALUES ('1')".to_string()),
            None,
        ));
        sink.record(&StatementEvent::new(EVENT_STATEMENT, "entity_list", None, None));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "statement");
        assert_eq!(first["operation"], "entity_create");
        assert!(first["statement"].as_str().unwrap().starts_with("INSERT INTO"));
        assert!(first["error"].is_null());
    }
}
