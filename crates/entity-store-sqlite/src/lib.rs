// crates/entity-store-sqlite/src/lib.rs
// ============================================================================
// Module: Entity Store SQLite Library
// Description: SQLite backend handle for the entity store.
// Purpose: Expose the SQLite backend and its configuration.
// Dependencies: crate::backend
// ============================================================================

//! ## Overview
//! Provides [`SqliteBackend`], an embedded backend for
//! [`entity_store_core::Store`]. Pair it with a store configuration whose
//! dialect is left unset (inferred from the driver name) or set to `sqlite`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::SQLITE_DRIVER_NAME;
pub use backend::SqliteBackend;
pub use backend::SqliteBackendConfig;
pub use backend::SqliteBackendError;
pub use backend::SqliteJournalMode;
pub use backend::SqliteSyncMode;
