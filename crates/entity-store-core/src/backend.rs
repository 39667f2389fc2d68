// crates/entity-store-core/src/backend.rs
// ============================================================================
// Module: Relational Backend Capability
// Description: Traits a relational handle implements to host the store.
// Purpose: Decouple EAV operations from any specific database driver.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The store consumes a relational engine through three small traits:
//! - [`Executor`] runs statement text and returns affected counts or rows.
//! - [`Session`] is an executor bound to one connection that can also
//!   begin, commit and roll back a transaction.
//! - [`Backend`] hands out sessions and reports its driver name, which is
//!   used to infer the SQL dialect.
//!
//! Row values are surfaced as text (or `NULL`), mirroring the text-only
//! storage contract for attribute values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by a relational backend handle.
///
/// # Invariants
/// - Messages carry the driver's error text unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection could not be acquired or was lost.
    #[error("backend connection error: {0}")]
    Connection(String),
    /// Statement was rejected by the engine.
    #[error("backend statement error: {0}")]
    Statement(String),
    /// Transaction control statement failed.
    #[error("backend transaction error: {0}")]
    Transaction(String),
    /// Result value could not be converted to text.
    #[error("backend decode error: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One result row keyed by column name.
///
/// # Invariants
/// - `columns` and `values` have equal length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Column names in projection order.
    columns: Vec<String>,
    /// Column values rendered as text; `None` is SQL `NULL`.
    values: Vec<Option<String>>,
}

impl Row {
    /// Builds a row from parallel column and value lists.
    ///
    /// Extra names or values beyond the shorter list are dropped.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        let width = columns.len().min(values.len());
        let mut columns = columns;
        let mut values = values;
        columns.truncate(width);
        values.truncate(width);
        Self {
            columns,
            values,
        }
    }

    /// Builds a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values) =
            pairs.into_iter().map(|(key, value)| (key.into(), value.map(Into::into))).unzip();
        Self {
            columns,
            values,
        }
    }

    /// Returns true when the row carries the named column.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Returns the column text, or `None` when missing or `NULL`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.position(column).and_then(|index| self.values.get(index)).and_then(Option::as_deref)
    }

    /// Returns the column names in projection order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Locates a column by case-insensitive name.
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name.eq_ignore_ascii_case(column))
    }
}

// ============================================================================
// SECTION: Capability Traits
// ============================================================================

/// Executes statement text against a connection or an open transaction.
pub trait Executor {
    /// Executes a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the engine rejects the statement.
    fn execute(&mut self, statement: &str) -> Result<u64, BackendError>;

    /// Executes a statement and collects its rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the engine rejects the statement.
    fn query(&mut self, statement: &str) -> Result<Vec<Row>, BackendError>;
}

/// A connection-scoped executor with transaction control.
pub trait Session: Executor {
    /// Opens a transaction on this session.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transaction`] when the transaction cannot start.
    fn begin(&mut self) -> Result<(), BackendError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transaction`] when the commit fails.
    fn commit(&mut self) -> Result<(), BackendError>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transaction`] when the rollback fails.
    fn rollback(&mut self) -> Result<(), BackendError>;
}

/// A relational backend handle.
pub trait Backend: Send + Sync {
    /// Returns the driver name used for dialect inference.
    fn driver_name(&self) -> &str;

    /// Acquires a session bound to one connection.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] when no connection is available.
    fn session(&self) -> Result<Box<dyn Session + '_>, BackendError>;
}

/// Shared backend handle.
pub type SharedBackend = Arc<dyn Backend>;
