// crates/entity-store-core/src/store/scope.rs
// ============================================================================
// Module: Operation Scope
// Description: Executable context shared by entity and attribute operations.
// Purpose: Run generated statements with logging on one executor.
// Dependencies: crate::backend, crate::logging
// ============================================================================

//! ## Overview
//! A [`Scope`] pairs the store context with a mutable executor. Every entity
//! and attribute operation is a method on `Scope`, so the same code runs on
//! a plain session or inside a transaction opened by
//! [`crate::Store::transaction`].

use crate::backend::Executor;
use crate::backend::Row;
use crate::config::TableNames;
use crate::dialect::Dialect;
use crate::error::StoreError;
use crate::schema::create_table_statements;
use crate::store::StoreContext;

/// Executable context for store operations.
pub struct Scope<'a> {
    /// Shared store settings.
    context: &'a StoreContext,
    /// Connection or transaction the statements run on.
    executor: &'a mut dyn Executor,
}

impl<'a> Scope<'a> {
    /// Binds the store context to an executor.
    pub(crate) fn new(context: &'a StoreContext, executor: &'a mut dyn Executor) -> Self {
        Self {
            context,
            executor,
        }
    }

    /// Returns the resolved table names.
    pub(crate) fn tables(&self) -> &'a TableNames {
        self.context.tables()
    }

    /// Returns the statement generator.
    pub(crate) fn dialect(&self) -> &'a dyn Dialect {
        self.context.dialect()
    }

    /// Executes a statement that returns no rows.
    pub(crate) fn execute(
        &mut self,
        operation: &'static str,
        statement: &str,
    ) -> Result<u64, StoreError> {
        let context = self.context;
        context.log_statement(operation, statement);
        self.executor.execute(statement).map_err(|err| {
            context.log_failure(operation, statement, &err);
            StoreError::Backend(err)
        })
    }

    /// Executes a statement and collects its rows.
    pub(crate) fn query(
        &mut self,
        operation: &'static str,
        statement: &str,
    ) -> Result<Vec<Row>, StoreError> {
        let context = self.context;
        context.log_statement(operation, statement);
        self.executor.query(statement).map_err(|err| {
            context.log_failure(operation, statement, &err);
            StoreError::Backend(err)
        })
    }

    /// Runs a `COUNT(*) AS count` statement and decodes the result.
    pub(crate) fn query_count(
        &mut self,
        operation: &'static str,
        statement: &str,
    ) -> Result<u64, StoreError> {
        let rows = self.query(operation, statement)?;
        let Some(row) = rows.first() else {
            return Ok(0);
        };
        match row.get("count") {
            None => Ok(0),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| StoreError::Corrupt(format!("invalid count value: {value}"))),
        }
    }

    /// Creates the four store tables when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] for the first failing statement; the
    /// remaining statements are not run.
    pub fn bootstrap(&mut self) -> Result<(), StoreError> {
        for statement in create_table_statements(self.tables(), self.dialect()) {
            self.execute("bootstrap", &statement)?;
        }
        Ok(())
    }
}

/// Rejects an empty required argument.
pub(crate) fn require(field: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::missing(field));
    }
    Ok(())
}
