// crates/entity-store-core/src/schema.rs
// ============================================================================
// Module: Schema Bootstrapper
// Description: Column names and per-dialect DDL for the four EAV tables.
// Purpose: Create the entity, attribute and trash tables idempotently.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The store persists into four tables whose names are configurable and
//! whose shapes are fixed:
//! - entities: `id`, `entity_type`, `entity_handle`, `created_at`, `updated_at`
//! - attributes: `id`, `entity_id`, `attribute_key`, `attribute_value`,
//!   `created_at`, `updated_at`
//! - the two trash tables: the same columns plus `deleted_at`, `deleted_by`
//!
//! Statements use `CREATE TABLE IF NOT EXISTS` and run outside a
//! transaction (see `Scope::bootstrap`). A failure part-way leaves the
//! earlier tables in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::config::TableNames;
use crate::dialect::Dialect;

// ============================================================================
// SECTION: Column Names
// ============================================================================

/// Primary key column of every table.
pub const COLUMN_ID: &str = "id";
/// Entity classification tag.
pub const COLUMN_ENTITY_TYPE: &str = "entity_type";
/// Entity secondary key.
pub const COLUMN_ENTITY_HANDLE: &str = "entity_handle";
/// Owning entity of an attribute.
pub const COLUMN_ENTITY_ID: &str = "entity_id";
/// Attribute key.
pub const COLUMN_ATTRIBUTE_KEY: &str = "attribute_key";
/// Attribute value text.
pub const COLUMN_ATTRIBUTE_VALUE: &str = "attribute_value";
/// Creation timestamp.
pub const COLUMN_CREATED_AT: &str = "created_at";
/// Last update timestamp.
pub const COLUMN_UPDATED_AT: &str = "updated_at";
/// Archive timestamp (trash tables only).
pub const COLUMN_DELETED_AT: &str = "deleted_at";
/// Archiving actor (trash tables only).
pub const COLUMN_DELETED_BY: &str = "deleted_by";

/// Columns of the live entity table.
pub const ENTITY_COLUMNS: [&str; 5] =
    [COLUMN_ID, COLUMN_ENTITY_TYPE, COLUMN_ENTITY_HANDLE, COLUMN_CREATED_AT, COLUMN_UPDATED_AT];

/// Columns of the live attribute table.
pub const ATTRIBUTE_COLUMNS: [&str; 6] = [
    COLUMN_ID,
    COLUMN_ENTITY_ID,
    COLUMN_ATTRIBUTE_KEY,
    COLUMN_ATTRIBUTE_VALUE,
    COLUMN_CREATED_AT,
    COLUMN_UPDATED_AT,
];

// ============================================================================
// SECTION: DDL
// ============================================================================

/// Column type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    /// Primary key identifier.
    PrimaryKey,
    /// Bounded text with a width.
    Varchar(u16),
    /// Bounded text that must be present.
    VarcharRequired(u16),
    /// Bounded text with an empty-string default.
    VarcharDefaultEmpty(u16),
    /// Unbounded text.
    Text,
    /// Dialect timestamp type.
    Timestamp,
}

/// Renders one column definition.
fn column_definition(dialect: &dyn Dialect, name: &str, column_type: ColumnType) -> String {
    let column = dialect.quote_identifier(name);
    match column_type {
        ColumnType::PrimaryKey => format!("{column} varchar(40) NOT NULL PRIMARY KEY"),
        ColumnType::Varchar(width) => format!("{column} varchar({width})"),
        ColumnType::VarcharRequired(width) => format!("{column} varchar({width}) NOT NULL"),
        ColumnType::VarcharDefaultEmpty(width) => {
            format!("{column} varchar({width}) NOT NULL DEFAULT ''")
        }
        ColumnType::Text => format!("{column} text"),
        ColumnType::Timestamp => format!("{column} {}", dialect.timestamp_type()),
    }
}

/// Renders a `CREATE TABLE IF NOT EXISTS` statement.
fn create_table(dialect: &dyn Dialect, table: &str, columns: &[(&str, ColumnType)]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, column_type)| column_definition(dialect, name, *column_type))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        dialect.quote_identifier(table),
        definitions.join(", ")
    )
}

/// Builds the DDL for all four tables in creation order: entities,
/// attributes, entity trash, attribute trash.
#[must_use]
pub fn create_table_statements(tables: &TableNames, dialect: &dyn Dialect) -> Vec<String> {
    let entity_columns = [
        (COLUMN_ID, ColumnType::PrimaryKey),
        (COLUMN_ENTITY_TYPE, ColumnType::VarcharRequired(40)),
        (COLUMN_ENTITY_HANDLE, ColumnType::VarcharDefaultEmpty(60)),
        (COLUMN_CREATED_AT, ColumnType::Timestamp),
        (COLUMN_UPDATED_AT, ColumnType::Timestamp),
    ];
    let attribute_columns = [
        (COLUMN_ID, ColumnType::PrimaryKey),
        (COLUMN_ENTITY_ID, ColumnType::VarcharRequired(40)),
        (COLUMN_ATTRIBUTE_KEY, ColumnType::VarcharRequired(255)),
        (COLUMN_ATTRIBUTE_VALUE, ColumnType::Text),
        (COLUMN_CREATED_AT, ColumnType::Timestamp),
        (COLUMN_UPDATED_AT, ColumnType::Timestamp),
    ];
    let trash_columns =
        [(COLUMN_DELETED_AT, ColumnType::Timestamp), (COLUMN_DELETED_BY, ColumnType::Varchar(40))];

    let entity_trash: Vec<(&str, ColumnType)> =
        entity_columns.iter().chain(trash_columns.iter()).copied().collect();
    let attribute_trash: Vec<(&str, ColumnType)> =
        attribute_columns.iter().chain(trash_columns.iter()).copied().collect();

    vec![
        create_table(dialect, &tables.entities, &entity_columns),
        create_table(dialect, &tables.attributes, &attribute_columns),
        create_table(dialect, &tables.entities_trash, &entity_trash),
        create_table(dialect, &tables.attributes_trash, &attribute_trash),
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================
