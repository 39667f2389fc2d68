// crates/entity-store-core/src/lib.rs
// ============================================================================
// Module: Entity Store Core Library
// Description: Public API surface for the entity-attribute-value store.
// Purpose: Expose records, filters, dialects and store operations.
// Dependencies: crate::{backend, codec, config, dialect, store}
// ============================================================================

//! ## Overview
//! Entity store core persists schema-less records ("entities") and their
//! open-ended key/value facts ("attributes") as plain rows in four tables on
//! any relational backend that implements [`Backend`]. Statement text is
//! generated per [`Dialect`]; multi-statement operations (create with
//! attributes, bulk attribute set, delete, trash) run in one transaction.
//!
//! Attribute values are stored as text. Typed access goes through the codec
//! in [`codec`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod codec;
pub mod config;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod identifiers;
pub mod logging;
pub mod model;
pub mod query;
pub mod schema;
pub mod store;
pub mod timestamp;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::Backend;
pub use backend::BackendError;
pub use backend::Executor;
pub use backend::Row;
pub use backend::Session;
pub use backend::SharedBackend;
pub use codec::AttributeValue;
pub use codec::CodecError;
pub use config::ConfigError;
pub use config::StoreConfig;
pub use config::TableNames;
pub use dialect::Dialect;
pub use dialect::DialectKind;
pub use error::StoreError;
pub use filter::AttributeQuery;
pub use filter::EntityQuery;
pub use logging::FileStatementSink;
pub use logging::NoopStatementSink;
pub use logging::StatementEvent;
pub use logging::StatementSink;
pub use logging::StderrStatementSink;
pub use model::Attribute;
pub use model::AttributeTrash;
pub use model::Entity;
pub use model::EntityTrash;
pub use query::SortOrder;
pub use store::Scope;
pub use store::Store;
