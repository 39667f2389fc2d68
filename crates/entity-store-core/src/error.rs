// crates/entity-store-core/src/error.rs
// ============================================================================
// Module: Entity Store Errors
// Description: Error taxonomy surfaced by store operations.
// Purpose: Distinguish caller mistakes from backend and data failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every store operation returns [`StoreError`]. Validation failures are
//! raised before any statement reaches the backend; backend failures carry
//! the driver's message; transaction failures report commit problems.

use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::CodecError;
use crate::config::ConfigError;

/// Store operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Required input was missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Stored value could not be decoded into the requested type.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Backend rejected a statement or connection.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Transaction could not be committed.
    #[error("transaction error: {0}")]
    Transaction(String),
    /// Store configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Row shape did not match the expected schema.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Builds a validation error for a missing required field.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self::Validation(format!("{field} is required"))
    }
}
