// crates/entity-store-postgres/src/lib.rs
// ============================================================================
// Module: Entity Store Postgres Library
// Description: Pooled Postgres backend handle for the entity store.
// Purpose: Expose the Postgres backend and its configuration.
// Dependencies: crate::backend
// ============================================================================

//! ## Overview
//! Provides [`PostgresBackend`], a pooled backend for
//! [`entity_store_core::Store`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::POSTGRES_DRIVER_NAME;
pub use backend::PostgresBackend;
pub use backend::PostgresBackendConfig;
pub use backend::PostgresBackendError;
