// crates/entity-store-core/src/model.rs
// ============================================================================
// Module: Entity Store Records
// Description: Entity, attribute and trash row types.
// Purpose: Typed views of the four EAV tables.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Records mirror the table shapes one-to-one. Identifiers and timestamps may
//! be left unset by callers (`""` and the Unix epoch); the store assigns them
//! before any insert statement is built.
//!
//! Rows read back from a backend are decoded with the `from_row`
//! constructors, which reject rows missing a column and treat `NULL` text as
//! empty and `NULL` timestamps as unset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::backend::Row;
use crate::codec::CodecError;
use crate::codec::decode_float;
use crate::codec::decode_int;
use crate::error::StoreError;
use crate::schema::COLUMN_ATTRIBUTE_KEY;
use crate::schema::COLUMN_ATTRIBUTE_VALUE;
use crate::schema::COLUMN_CREATED_AT;
use crate::schema::COLUMN_DELETED_AT;
use crate::schema::COLUMN_DELETED_BY;
use crate::schema::COLUMN_ENTITY_HANDLE;
use crate::schema::COLUMN_ENTITY_ID;
use crate::schema::COLUMN_ENTITY_TYPE;
use crate::schema::COLUMN_ID;
use crate::schema::COLUMN_UPDATED_AT;
use crate::timestamp::parse_datetime;

// ============================================================================
// SECTION: Records
// ============================================================================

/// A typed, identified record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque identifier.
    pub id: String,
    /// Classification tag.
    pub entity_type: String,
    /// Optional secondary key; empty when absent.
    pub entity_handle: String,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Entity {
    /// Creates an unsaved entity of `entity_type`.
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            entity_type: entity_type.into(),
            entity_handle: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Sets a caller-chosen identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the secondary key.
    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.entity_handle = handle.into();
        self
    }

    /// Decodes a live entity row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when a column is missing or a
    /// timestamp cannot be parsed.
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: text(row, COLUMN_ID)?,
            entity_type: text(row, COLUMN_ENTITY_TYPE)?,
            entity_handle: text(row, COLUMN_ENTITY_HANDLE)?,
            created_at: timestamp(row, COLUMN_CREATED_AT)?,
            updated_at: timestamp(row, COLUMN_UPDATED_AT)?,
        })
    }
}

/// One key/value fact attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Opaque identifier.
    pub id: String,
    /// Owning entity identifier.
    pub entity_id: String,
    /// Attribute key; never empty once persisted.
    pub attribute_key: String,
    /// Encoded attribute value.
    pub attribute_value: String,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Attribute {
    /// Creates an unsaved attribute.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        attribute_key: impl Into<String>,
        attribute_value: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            entity_id: entity_id.into(),
            attribute_key: attribute_key.into(),
            attribute_value: attribute_value.into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Decodes the value as `int64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotNumeric`] when the value is not an integer.
    pub fn as_int(&self) -> Result<i64, CodecError> {
        decode_int(&self.attribute_value)
    }

    /// Decodes the value as `float64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotNumeric`] when the value is not a float.
    pub fn as_float(&self) -> Result<f64, CodecError> {
        decode_float(&self.attribute_value)
    }

    /// Decodes a live attribute row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when a column is missing or a
    /// timestamp cannot be parsed.
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: text(row, COLUMN_ID)?,
            entity_id: text(row, COLUMN_ENTITY_ID)?,
            attribute_key: text(row, COLUMN_ATTRIBUTE_KEY)?,
            attribute_value: text(row, COLUMN_ATTRIBUTE_VALUE)?,
            created_at: timestamp(row, COLUMN_CREATED_AT)?,
            updated_at: timestamp(row, COLUMN_UPDATED_AT)?,
        })
    }
}

/// Archived copy of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTrash {
    /// Archived entity fields.
    #[serde(flatten)]
    pub entity: Entity,
    /// Archive time.
    #[serde(with = "time::serde::rfc3339")]
    pub deleted_at: OffsetDateTime,
    /// Archiving actor; empty when not recorded.
    pub deleted_by: String,
}

impl EntityTrash {
    /// Decodes an entity trash row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when a column is missing or a
    /// timestamp cannot be parsed.
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            entity: Entity::from_row(row)?,
            deleted_at: timestamp(row, COLUMN_DELETED_AT)?,
            deleted_by: text(row, COLUMN_DELETED_BY)?,
        })
    }
}

/// Archived copy of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTrash {
    /// Archived attribute fields.
    #[serde(flatten)]
    pub attribute: Attribute,
    /// Archive time.
    #[serde(with = "time::serde::rfc3339")]
    pub deleted_at: OffsetDateTime,
    /// Archiving actor; empty when not recorded.
    pub deleted_by: String,
}

impl AttributeTrash {
    /// Decodes an attribute trash row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when a column is missing or a
    /// timestamp cannot be parsed.
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            attribute: Attribute::from_row(row)?,
            deleted_at: timestamp(row, COLUMN_DELETED_AT)?,
            deleted_by: text(row, COLUMN_DELETED_BY)?,
        })
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Reads a text column; `NULL` becomes the empty string.
fn text(row: &Row, column: &str) -> Result<String, StoreError> {
    if !row.has_column(column) {
        return Err(StoreError::Corrupt(format!("missing column {column}")));
    }
    Ok(row.get(column).unwrap_or_default().to_string())
}

/// Reads a timestamp column; `NULL` becomes the Unix epoch.
fn timestamp(row: &Row, column: &str) -> Result<OffsetDateTime, StoreError> {
    if !row.has_column(column) {
        return Err(StoreError::Corrupt(format!("missing column {column}")));
    }
    match row.get(column) {
        None => Ok(OffsetDateTime::UNIX_EPOCH),
        Some(value) => parse_datetime(value).map_err(StoreError::Corrupt),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
