// crates/entity-store-core/src/store/tests.rs
// ============================================================================
// Module: Store Transaction Tests
// Description: Statement sequencing against a scripted in-memory backend.
// Purpose: Verify begin/commit/rollback boundaries without a database.
// Dependencies: crate::store
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;

use super::Store;
use crate::backend::Backend;
use crate::backend::BackendError;
use crate::backend::Executor;
use crate::backend::Row;
use crate::backend::Session;
use crate::config::ConfigError;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::logging::StatementEvent;
use crate::logging::StatementSink;

// ============================================================================
// SECTION: Scripted Backend
// ============================================================================

/// Backend that records statements and replays queued query results.
#[derive(Default)]
struct ScriptedBackend {
    /// Driver name reported to the store.
    driver: String,
    /// Every statement and transaction command, in order.
    log: Mutex<Vec<String>>,
    /// Query results handed out in order; empty when exhausted.
    results: Mutex<VecDeque<Vec<Row>>>,
    /// Statements containing this text fail.
    fail_on: Option<String>,
    /// Fails `COMMIT`.
    fail_commit: bool,
    /// Fails `ROLLBACK`.
    fail_rollback: bool,
}

impl ScriptedBackend {
    fn sqlite() -> Self {
        Self {
            driver: "sqlite".to_string(),
            ..Self::default()
        }
    }

    fn push_result(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }
}

struct ScriptedSession<'a> {
    backend: &'a ScriptedBackend,
}

impl Executor for ScriptedSession<'_> {
    fn execute(&mut self, statement: &str) -> Result<u64, BackendError> {
        self.backend.record(statement);
        if let Some(needle) = &self.backend.fail_on
            && statement.contains(needle.as_str())
        {
            return Err(BackendError::Statement("scripted failure".to_string()));
        }
        Ok(1)
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Row>, BackendError> {
        self.backend.record(statement);
        Ok(self.backend.results.lock().unwrap().pop_front().unwrap_or_default())
    }
}

impl Session for ScriptedSession<'_> {
    fn begin(&mut self) -> Result<(), BackendError> {
        self.backend.record("BEGIN");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.backend.record("COMMIT");
        if self.backend.fail_commit {
            return Err(BackendError::Transaction("commit refused".to_string()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.backend.record("ROLLBACK");
        if self.backend.fail_rollback {
            return Err(BackendError::Transaction("rollback refused".to_string()));
        }
        Ok(())
    }
}

impl Backend for ScriptedBackend {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn session(&self) -> Result<Box<dyn Session + '_>, BackendError> {
        Ok(Box::new(ScriptedSession {
            backend: self,
        }))
    }
}

/// Sink that keeps events in memory.
#[derive(Default)]
struct MemorySink {
    events: Mutex<Vec<StatementEvent>>,
}

impl StatementSink for MemorySink {
    fn record(&self, event: &StatementEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn store_on(backend: &Arc<ScriptedBackend>, debug: bool) -> (Store, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let store = Store::with_sink(
        StoreConfig::new("ents", "attrs").with_debug(debug),
        Arc::clone(backend) as Arc<dyn Backend>,
        Arc::clone(&sink) as Arc<dyn StatementSink>,
    )
    .unwrap();
    (store, sink)
}

fn entity_row(id: &str) -> Row {
    Row::from_pairs([
        ("id", Some(id)),
        ("entity_type", Some("post")),
        ("entity_handle", Some("")),
        ("created_at", Some("2024-01-01 00:00:00")),
        ("updated_at", Some("2024-01-01 00:00:00")),
    ])
}

fn attribute_row(id: &str, entity_id: &str, key: &str) -> Row {
    Row::from_pairs([
        ("id", Some(id)),
        ("entity_id", Some(entity_id)),
        ("attribute_key", Some(key)),
        ("attribute_value", Some("v")),
        ("created_at", Some("2024-01-01 00:00:00")),
        ("updated_at", Some("2024-01-01 00:00:00")),
    ])
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn create_with_attributes_commits_once() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, _) = store_on(&backend, false);
    store.entity_create_with_attributes("post", [("name", "Hello"), ("path", "/")]).unwrap();

    let log = backend.log();
    assert_eq!(log.len(), 5);
    assert_eq!(log[0], "BEGIN");
    assert!(log[1].starts_with("INSERT INTO \"ents\""));
    assert!(log[2].starts_with("INSERT INTO \"attrs\""));
    assert!(log[3].starts_with("INSERT INTO \"attrs\""));
    assert_eq!(log[4], "COMMIT");
}

#[test]
fn failing_attribute_insert_rolls_back_entity() {
    let backend = Arc::new(ScriptedBackend {
        fail_on: Some("INSERT INTO \"attrs\"".to_string()),
        ..ScriptedBackend::sqlite()
    });
    let (store, _) = store_on(&backend, false);
    let err = store.entity_create_with_attributes("post", [("name", "Hello")]).unwrap_err();

    assert!(matches!(err, StoreError::Backend(BackendError::Statement(_))));
    let log = backend.log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!log.iter().any(|entry| entry == "COMMIT"));
}

#[test]
fn validation_errors_reach_no_backend() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, _) = store_on(&backend, false);

    assert!(matches!(store.entity_create(""), Err(StoreError::Validation(_))));
    assert!(matches!(store.attribute_create("e1", "", "v"), Err(StoreError::Validation(_))));
    assert!(matches!(store.attribute_find("", "k"), Err(StoreError::Validation(_))));
    assert!(matches!(store.entity_find_by_id(""), Err(StoreError::Validation(_))));
    assert!(matches!(store.entity_find_by_handle("post", ""), Err(StoreError::Validation(_))));
    assert!(matches!(store.entity_delete(""), Err(StoreError::Validation(_))));
    assert!(matches!(store.entity_trash(""), Err(StoreError::Validation(_))));
    assert!(matches!(
        store.attributes_set("e1", [("ok", "1"), ("", "2")]),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.entity_create_with_attributes("post", [("", "x")]),
        Err(StoreError::Validation(_))
    ));
    assert!(backend.log().is_empty());
}

#[test]
fn commit_failure_is_a_transaction_error() {
    let backend = Arc::new(ScriptedBackend {
        fail_commit: true,
        ..ScriptedBackend::sqlite()
    });
    let (store, _) = store_on(&backend, false);
    let err = store.entity_delete("e1").unwrap_err();

    assert!(matches!(err, StoreError::Transaction(_)));
    assert_eq!(backend.log().last().map(String::as_str), Some("ROLLBACK"));
}

#[test]
fn rollback_failure_keeps_original_error_and_is_logged() {
    let backend = Arc::new(ScriptedBackend {
        fail_on: Some("DELETE FROM \"ents\"".to_string()),
        fail_rollback: true,
        ..ScriptedBackend::sqlite()
    });
    let (store, sink) = store_on(&backend, true);
    let err = store.entity_delete("e1").unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    let events = sink.events.lock().unwrap();
    let names: Vec<&str> = events.iter().map(|event| event.event).collect();
    assert_eq!(names, ["statement", "statement", "statement_failed", "rollback_failed"]);
    assert_eq!(events[3].operation, "entity_delete");
}

#[test]
fn panicking_closure_rolls_back() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, _) = store_on(&backend, false);
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), StoreError> = store.transaction("test", |scope| {
            scope.entity_create("post")?;
            panic!("boom");
        });
    }));

    assert!(outcome.is_err());
    let log = backend.log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
}

#[test]
fn unwind_rollback_failure_is_logged() {
    let backend = Arc::new(ScriptedBackend {
        fail_rollback: true,
        ..ScriptedBackend::sqlite()
    });
    let (store, sink) = store_on(&backend, true);
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), StoreError> = store.transaction("import", |scope| {
            scope.entity_create("post")?;
            panic!("boom");
        });
    }));

    assert!(outcome.is_err());
    assert_eq!(backend.log().last().map(String::as_str), Some("ROLLBACK"));
    let events = sink.events.lock().unwrap();
    let names: Vec<&str> = events.iter().map(|event| event.event).collect();
    assert_eq!(names, ["statement", "rollback_failed"]);
    assert_eq!(events[1].operation, "import");
    assert!(events[1].error.is_some());
}

#[test]
fn trash_runs_every_step_in_one_transaction() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    backend.push_result(vec![entity_row("e1")]);
    backend.push_result(vec![attribute_row("a1", "e1", "name"), attribute_row("a2", "e1", "path")]);
    let (store, _) = store_on(&backend, false);
    assert!(store.entity_trash_by("e1", "admin").unwrap());

    let log = backend.log();
    let expected_prefixes = [
        "BEGIN",
        "SELECT * FROM \"ents\"",
        "INSERT INTO \"ents_trash\"",
        "SELECT * FROM \"attrs\"",
        "INSERT INTO \"attrs_trash\"",
        "INSERT INTO \"attrs_trash\"",
        "DELETE FROM \"attrs\"",
        "DELETE FROM \"ents\"",
        "COMMIT",
    ];
    assert_eq!(log.len(), expected_prefixes.len());
    for (entry, prefix) in log.iter().zip(expected_prefixes) {
        assert!(entry.starts_with(prefix), "{entry} does not start with {prefix}");
    }
    assert!(log[2].contains("'admin'"));
}

#[test]
fn trash_of_missing_entity_writes_nothing() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, _) = store_on(&backend, false);
    assert!(!store.entity_trash("missing").unwrap());

    let log = backend.log();
    assert_eq!(log.len(), 3);
    assert!(log[1].starts_with("SELECT"));
    assert_eq!(log[2], "COMMIT");
}

#[test]
fn list_by_attribute_short_circuits_on_no_match() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, _) = store_on(&backend, false);
    assert!(store.entity_list_by_attribute("page", "path", "/").unwrap().is_empty());

    let log = backend.log();
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("LEFT JOIN \"ents\" ON \"attrs\".\"entity_id\" = \"ents\".\"id\""));
}

#[test]
fn auto_migrate_creates_tables_outside_transaction() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let sink = Arc::new(MemorySink::default());
    Store::with_sink(
        StoreConfig::new("ents", "attrs").with_auto_migrate(true),
        Arc::clone(&backend) as Arc<dyn Backend>,
        sink,
    )
    .unwrap();

    let log = backend.log();
    assert_eq!(log.len(), 4);
    assert!(log.iter().all(|entry| entry.starts_with("CREATE TABLE IF NOT EXISTS")));
}

#[test]
fn unknown_driver_is_a_config_error() {
    let backend = Arc::new(ScriptedBackend {
        driver: "oracle".to_string(),
        ..ScriptedBackend::default()
    });
    let result = Store::new(StoreConfig::new("ents", "attrs"), backend);
    assert!(matches!(result, Err(StoreError::Config(ConfigError::Invalid(_)))));
}

#[test]
fn debug_off_records_no_events() {
    let backend = Arc::new(ScriptedBackend::sqlite());
    let (store, sink) = store_on(&backend, false);
    store.entity_create("post").unwrap();
    assert!(sink.events.lock().unwrap().is_empty());
}
