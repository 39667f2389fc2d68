// crates/entity-store-sqlite/src/backend.rs
// ============================================================================
// Module: SQLite Backend
// Description: Entity store backend over a single SQLite connection.
// Purpose: Host the EAV store in an embedded SQLite database.
// Dependencies: entity-store-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteBackend`] owns one `SQLite` connection behind a mutex. A session
//! holds the lock for its whole lifetime, so transactions opened by the
//! store are serialized within the process; `BEGIN IMMEDIATE` takes the
//! database write lock up front so concurrent processes wait on the busy
//! timeout instead of failing mid-transaction.
//!
//! Result values are rendered as text: integers and reals via their decimal
//! form, text as-is, and blobs only when they hold UTF-8.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use entity_store_core::Backend;
use entity_store_core::BackendError;
use entity_store_core::Executor;
use entity_store_core::Row;
use entity_store_core::Session;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Driver name reported to the store for dialect inference.
pub const SQLITE_DRIVER_NAME: &str = "sqlite";
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Longest accepted path segment, in bytes.
const MAX_FILE_SEGMENT_BYTES: usize = 255;
/// Longest accepted database file path, in bytes.
const MAX_FILE_PATH_BYTES: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// How the database file journals writes before they reach the main file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// Write-ahead log; readers keep working while a transaction commits.
    #[default]
    Wal,
    /// Rollback journal removed after each commit.
    Delete,
}

/// How hard `SQLite` flushes to disk at commit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Flush at every critical moment.
    #[default]
    Full,
    /// Flush less often; committed entities may be lost on power failure.
    Normal,
}

/// Configuration for a file-backed `SQLite` backend.
///
/// # Invariants
/// - `path` names a database file; an existing directory is rejected on open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteBackendConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteBackendConfig {
    /// Creates a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }

    /// Renders the journal and sync settings as one pragma batch.
    fn pragma_batch(&self) -> String {
        let journal = match self.journal_mode {
            SqliteJournalMode::Wal => "WAL",
            SqliteJournalMode::Delete => "DELETE",
        };
        let sync = match self.sync_mode {
            SqliteSyncMode::Full => "FULL",
            SqliteSyncMode::Normal => "NORMAL",
        };
        format!("PRAGMA journal_mode = {journal}; PRAGMA synchronous = {sync};")
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` backend construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteBackendError {
    /// Filesystem error while preparing the database path.
    #[error("sqlite backend io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite backend db error: {0}")]
    Db(String),
    /// Invalid configuration.
    #[error("sqlite backend invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Entity store backend over one `SQLite` connection.
pub struct SqliteBackend {
    /// Shared connection; a session holds the lock while it lives.
    connection: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (creating when needed) the database file described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError`] when the path is unsafe, the parent
    /// directory cannot be created, or `SQLite` rejects the connection.
    pub fn open(config: &SqliteBackendConfig) -> Result<Self, SqliteBackendError> {
        check_database_file(&config.path)?;
        create_database_dir(&config.path)?;
        let connection = connect_file(config)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError::Db`] when `SQLite` cannot open it.
    pub fn open_in_memory() -> Result<Self, SqliteBackendError> {
        let connection =
            Connection::open_in_memory().map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        connection
            .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
            .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection for one session.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.connection
            .lock()
            .map_err(|_| BackendError::Connection("sqlite connection lock poisoned".to_string()))
    }
}

impl Backend for SqliteBackend {
    fn driver_name(&self) -> &str {
        SQLITE_DRIVER_NAME
    }

    fn session(&self) -> Result<Box<dyn Session + '_>, BackendError> {
        Ok(Box::new(SqliteSession {
            connection: self.lock()?,
        }))
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Session bound to the locked connection.
struct SqliteSession<'a> {
    /// Locked connection.
    connection: MutexGuard<'a, Connection>,
}

impl Executor for SqliteSession<'_> {
    fn execute(&mut self, statement: &str) -> Result<u64, BackendError> {
        let changed = self
            .connection
            .execute(statement, [])
            .map_err(|err| BackendError::Statement(err.to_string()))?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Row>, BackendError> {
        let mut prepared = self
            .connection
            .prepare(statement)
            .map_err(|err| BackendError::Statement(err.to_string()))?;
        let columns: Vec<String> =
            prepared.column_names().iter().map(|name| (*name).to_string()).collect();
        let mut rows =
            prepared.query([]).map_err(|err| BackendError::Statement(err.to_string()))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(|err| BackendError::Statement(err.to_string()))? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0 .. columns.len() {
                let value =
                    row.get_ref(index).map_err(|err| BackendError::Decode(err.to_string()))?;
                values.push(value_text(value)?);
            }
            collected.push(Row::new(columns.clone(), values));
        }
        Ok(collected)
    }
}

impl Session for SqliteSession<'_> {
    fn begin(&mut self) -> Result<(), BackendError> {
        self.connection
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|err| BackendError::Transaction(err.to_string()))
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.connection
            .execute_batch("COMMIT")
            .map_err(|err| BackendError::Transaction(err.to_string()))
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.connection
            .execute_batch("ROLLBACK")
            .map_err(|err| BackendError::Transaction(err.to_string()))
    }
}

/// Renders a result value as text.
fn value_text(value: ValueRef<'_>) -> Result<Option<String>, BackendError> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(number) => Ok(Some(number.to_string())),
        ValueRef::Real(number) => Ok(Some(number.to_string())),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes)
            .map(|text| Some(text.to_string()))
            .map_err(|err| BackendError::Decode(err.to_string())),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects database file paths the store refuses to open.
fn check_database_file(path: &Path) -> Result<(), SqliteBackendError> {
    let rendered = path.to_string_lossy();
    if rendered.is_empty() {
        return Err(SqliteBackendError::Invalid("no database file given".to_string()));
    }
    if rendered.len() > MAX_FILE_PATH_BYTES {
        return Err(SqliteBackendError::Invalid(format!(
            "database file path is longer than {MAX_FILE_PATH_BYTES} bytes"
        )));
    }
    if path.iter().any(|segment| segment.len() > MAX_FILE_SEGMENT_BYTES) {
        return Err(SqliteBackendError::Invalid(format!(
            "database file path has a segment longer than {MAX_FILE_SEGMENT_BYTES} bytes"
        )));
    }
    if path.is_dir() {
        return Err(SqliteBackendError::Invalid(format!(
            "{rendered} is a directory; expected a database file"
        )));
    }
    Ok(())
}

/// Creates the directory that will hold the database file.
fn create_database_dir(path: &Path) -> Result<(), SqliteBackendError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|err| SqliteBackendError::Io(format!("{}: {err}", dir.display()))),
        Some(_) => Ok(()),
        None => Err(SqliteBackendError::Io(format!(
            "{} has no directory to hold a database file",
            path.display()
        ))),
    }
}

/// Opens the database file and applies the configured pragmas.
fn connect_file(config: &SqliteBackendConfig) -> Result<Connection, SqliteBackendError> {
    let connection = Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    connection
        .execute_batch(&config.pragma_batch())
        .and_then(|()| connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)))
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    Ok(connection)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
