// crates/entity-store-core/src/store/mod.rs
// ============================================================================
// Module: Entity Store
// Description: Store handle, shared context and transaction boundaries.
// Purpose: Run entity and attribute operations against a backend.
// Dependencies: crate::backend, crate::config, crate::logging
// ============================================================================

//! ## Overview
//! [`Store`] couples an immutable context (table names, dialect, logging)
//! with a shared backend handle. Operations are written once on [`Scope`],
//! which runs against any [`Executor`]: a plain session for single-statement
//! operations, or an open transaction for multi-statement ones.
//!
//! [`Store::transaction`] is the only transaction boundary. It commits when
//! the closure returns `Ok`, rolls back when it returns `Err`, and rolls back
//! from a drop guard when the closure unwinds.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod attribute;
mod entity;
mod scope;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::backend::BackendError;
use crate::backend::Executor;
use crate::backend::Session;
use crate::backend::SharedBackend;
use crate::config::StoreConfig;
use crate::config::TableNames;
use crate::dialect::Dialect;
use crate::dialect::DialectKind;
use crate::error::StoreError;
use crate::logging::EVENT_ROLLBACK_FAILED;
use crate::logging::EVENT_STATEMENT;
use crate::logging::EVENT_STATEMENT_FAILED;
use crate::logging::StatementEvent;
use crate::logging::StatementSink;
use crate::logging::StderrStatementSink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use scope::Scope;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Immutable settings shared by every operation of a store.
pub(crate) struct StoreContext {
    /// Resolved table names.
    tables: TableNames,
    /// Statement generator.
    dialect: Box<dyn Dialect>,
    /// Emits statement events when set.
    debug: bool,
    /// Statement event destination.
    sink: Arc<dyn StatementSink>,
}

impl StoreContext {
    /// Returns the resolved table names.
    pub(crate) const fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Returns the statement generator.
    pub(crate) fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Records a statement about to run.
    pub(crate) fn log_statement(&self, operation: &'static str, statement: &str) {
        if self.debug {
            self.sink.record(&StatementEvent::new(
                EVENT_STATEMENT,
                operation,
                Some(statement.to_string()),
                None,
            ));
        }
    }

    /// Records a statement the backend rejected.
    pub(crate) fn log_failure(&self, operation: &'static str, statement: &str, err: &BackendError) {
        if self.debug {
            self.sink.record(&StatementEvent::new(
                EVENT_STATEMENT_FAILED,
                operation,
                Some(statement.to_string()),
                Some(err.to_string()),
            ));
        }
    }

    /// Records a rollback that failed after an earlier error.
    fn log_rollback_failure(&self, operation: &'static str, err: &BackendError) {
        if self.debug {
            self.sink.record(&StatementEvent::new(
                EVENT_ROLLBACK_FAILED,
                operation,
                None,
                Some(err.to_string()),
            ));
        }
    }
}

// ============================================================================
// SECTION: Transaction Guard
// ============================================================================

/// Open transaction on a session; rolls back on drop unless finished.
struct TransactionGuard<'b> {
    /// Session holding the transaction.
    session: Box<dyn Session + 'b>,
    /// Receives rollback failures.
    context: &'b StoreContext,
    /// Operation name recorded with rollback failures.
    label: &'static str,
    /// True until commit or rollback has been attempted.
    open: bool,
}

impl<'b> TransactionGuard<'b> {
    /// Begins a transaction on `session`.
    fn begin(
        mut session: Box<dyn Session + 'b>,
        context: &'b StoreContext,
        label: &'static str,
    ) -> Result<Self, StoreError> {
        session.begin().map_err(|err| StoreError::Transaction(err.to_string()))?;
        Ok(Self {
            session,
            context,
            label,
            open: true,
        })
    }

    /// Commits the transaction.
    fn commit(&mut self) -> Result<(), BackendError> {
        self.open = false;
        self.session.commit()
    }

    /// Rolls back the transaction, logging a failed rollback.
    fn rollback(&mut self) {
        self.open = false;
        if let Err(err) = self.session.rollback() {
            self.context.log_rollback_failure(self.label, &err);
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.open {
            self.rollback();
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Entity-attribute-value store over a relational backend.
///
/// # Invariants
/// - Table names and dialect are fixed at construction.
/// - Every multi-statement operation runs inside one transaction.
#[derive(Clone)]
pub struct Store {
    /// Shared immutable settings.
    context: Arc<StoreContext>,
    /// Backend handle.
    backend: SharedBackend,
}

impl Store {
    /// Builds a store that logs statements to stderr when `debug` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the configuration is invalid or
    /// the dialect cannot be resolved, and [`StoreError::Backend`] when
    /// `auto_migrate` is set and schema creation fails.
    pub fn new(config: StoreConfig, backend: SharedBackend) -> Result<Self, StoreError> {
        Self::with_sink(config, backend, Arc::new(StderrStatementSink))
    }

    /// Builds a store with a custom statement sink.
    ///
    /// # Errors
    ///
    /// Same as [`Store::new`].
    pub fn with_sink(
        config: StoreConfig,
        backend: SharedBackend,
        sink: Arc<dyn StatementSink>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let kind = match config.dialect {
            Some(kind) => kind,
            None => DialectKind::from_driver_name(backend.driver_name())?,
        };
        let store = Self {
            context: Arc::new(StoreContext {
                tables: config.table_names(),
                dialect: kind.dialect(),
                debug: config.debug,
                sink,
            }),
            backend,
        };
        if config.auto_migrate {
            store.auto_migrate()?;
        }
        Ok(store)
    }

    /// Creates any missing tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] for the first failing statement.
    pub fn auto_migrate(&self) -> Result<(), StoreError> {
        self.with_scope(|scope| scope.bootstrap())
    }

    /// Returns the resolved table names.
    #[must_use]
    pub fn tables(&self) -> &TableNames {
        self.context.tables()
    }

    /// Returns the active dialect.
    #[must_use]
    pub fn dialect_kind(&self) -> DialectKind {
        self.context.dialect().kind()
    }

    /// Returns a scope over a caller-owned executor.
    ///
    /// Operations run on the executor as-is, so a caller holding its own
    /// transaction can compose store operations into it.
    pub fn scope<'a>(&'a self, executor: &'a mut dyn Executor) -> Scope<'a> {
        Scope::new(&self.context, executor)
    }

    /// Runs `operation` on a fresh session without a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when no session is available, or the
    /// error returned by `operation`.
    pub fn with_scope<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, StoreError>,
    {
        let mut session = self.backend.session()?;
        let mut scope = Scope::new(&self.context, session.as_mut());
        operation(&mut scope)
    }

    /// Runs `operation` inside one transaction.
    ///
    /// Commits when `operation` returns `Ok`; rolls back when it returns
    /// `Err` or unwinds. A failing rollback is logged and the original error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] when the transaction cannot begin
    /// or commit, or the error returned by `operation`.
    pub fn transaction<T, F>(&self, label: &'static str, operation: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, StoreError>,
    {
        let mut guard =
            TransactionGuard::begin(self.backend.session()?, &self.context, label)?;
        let result = {
            let mut scope = Scope::new(&self.context, guard.session.as_mut());
            operation(&mut scope)
        };
        match result {
            Ok(value) => match guard.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    guard.rollback();
                    Err(StoreError::Transaction(err.to_string()))
                }
            },
            Err(err) => {
                guard.rollback();
                Err(err)
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
