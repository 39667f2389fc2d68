// crates/entity-store-core/src/filter.rs
// ============================================================================
// Module: Entity Store Filters
// Description: Fixed filter, sort and pagination options for list queries.
// Purpose: Translate caller filters into select statements.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`EntityQuery`] and [`AttributeQuery`] are the only query surface the
//! store offers: equality filters, an id set, one sort column, pagination and
//! a count-only switch. Unset fields do not constrain the result.
//!
//! `sort_by` must name a column of the target table; any other value is a
//! validation error. An explicitly empty `ids` set matches nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::error::StoreError;
use crate::query::Column;
use crate::query::SelectQuery;
use crate::query::SortOrder;
use crate::schema::ATTRIBUTE_COLUMNS;
use crate::schema::COLUMN_ATTRIBUTE_KEY;
use crate::schema::COLUMN_ENTITY_HANDLE;
use crate::schema::COLUMN_ENTITY_ID;
use crate::schema::COLUMN_ENTITY_TYPE;
use crate::schema::COLUMN_ID;
use crate::schema::ENTITY_COLUMNS;

// ============================================================================
// SECTION: Shared Options
// ============================================================================

/// Applies sort, pagination and count options to a select.
fn finish_select(
    mut select: SelectQuery,
    allowed: &[&str],
    sort_by: Option<&str>,
    sort_order: SortOrder,
    offset: Option<u64>,
    limit: Option<u64>,
    count_only: bool,
) -> Result<SelectQuery, StoreError> {
    let sort_column = sort_by.unwrap_or(COLUMN_ID);
    if !allowed.contains(&sort_column) {
        return Err(StoreError::Validation(format!("unknown sort column: {sort_column}")));
    }
    if count_only {
        return Ok(select.count());
    }
    select = select.order_by(Column::new(sort_column), sort_order);
    if let Some(limit) = limit {
        select = select.limit(limit);
    }
    if let Some(offset) = offset {
        select = select.offset(offset);
    }
    Ok(select)
}

// ============================================================================
// SECTION: Entity Filters
// ============================================================================

/// Entity list/count filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityQuery {
    /// Exact id.
    pub id: Option<String>,
    /// Id set; `Some(vec![])` matches nothing.
    pub ids: Option<Vec<String>>,
    /// Exact entity type.
    pub entity_type: Option<String>,
    /// Exact entity handle.
    pub entity_handle: Option<String>,
    /// Sort column; defaults to `id`.
    pub sort_by: Option<String>,
    /// Sort direction; defaults to ascending.
    pub sort_order: SortOrder,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum rows.
    pub limit: Option<u64>,
    /// Projects `COUNT(*)` instead of rows.
    pub count_only: bool,
}

impl EntityQuery {
    /// Filters by id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Filters by an id set.
    #[must_use]
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Filters by entity type.
    #[must_use]
    pub fn by_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    /// Sets the maximum row count.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true when the id set is present and empty.
    #[must_use]
    pub fn matches_nothing(&self) -> bool {
        self.ids.as_ref().is_some_and(Vec::is_empty)
    }

    /// Builds the select statement over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `sort_by` is not an entity
    /// column.
    pub fn to_select(&self, table: &str) -> Result<SelectQuery, StoreError> {
        let mut select = SelectQuery::from(table);
        if let Some(id) = &self.id {
            select = select.filter_eq(Column::new(COLUMN_ID), id);
        }
        if let Some(ids) = &self.ids {
            select = select.filter_in(Column::new(COLUMN_ID), ids);
        }
        if let Some(entity_type) = &self.entity_type {
            select = select.filter_eq(Column::new(COLUMN_ENTITY_TYPE), entity_type);
        }
        if let Some(entity_handle) = &self.entity_handle {
            select = select.filter_eq(Column::new(COLUMN_ENTITY_HANDLE), entity_handle);
        }
        finish_select(
            select,
            &ENTITY_COLUMNS,
            self.sort_by.as_deref(),
            self.sort_order,
            self.offset,
            self.limit,
            self.count_only,
        )
    }
}

// ============================================================================
// SECTION: Attribute Filters
// ============================================================================

/// Attribute list/count filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeQuery {
    /// Exact id.
    pub id: Option<String>,
    /// Id set; `Some(vec![])` matches nothing.
    pub ids: Option<Vec<String>>,
    /// Owning entity id.
    pub entity_id: Option<String>,
    /// Exact attribute key.
    pub attribute_key: Option<String>,
    /// Sort column; defaults to `id`.
    pub sort_by: Option<String>,
    /// Sort direction; defaults to ascending.
    pub sort_order: SortOrder,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum rows.
    pub limit: Option<u64>,
    /// Projects `COUNT(*)` instead of rows.
    pub count_only: bool,
}

impl AttributeQuery {
    /// Filters by owning entity.
    #[must_use]
    pub fn by_entity(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..Self::default()
        }
    }

    /// Filters by owning entity and key.
    #[must_use]
    pub fn by_entity_key(entity_id: impl Into<String>, attribute_key: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            attribute_key: Some(attribute_key.into()),
            ..Self::default()
        }
    }

    /// Sets the maximum row count.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort column and direction.
    #[must_use]
    pub fn sorted_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(column.into());
        self.sort_order = order;
        self
    }

    /// Returns true when the id set is present and empty.
    #[must_use]
    pub fn matches_nothing(&self) -> bool {
        self.ids.as_ref().is_some_and(Vec::is_empty)
    }

    /// Builds the select statement over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `sort_by` is not an attribute
    /// column.
    pub fn to_select(&self, table: &str) -> Result<SelectQuery, StoreError> {
        let mut select = SelectQuery::from(table);
        if let Some(id) = &self.id {
            select = select.filter_eq(Column::new(COLUMN_ID), id);
        }
        if let Some(ids) = &self.ids {
            select = select.filter_in(Column::new(COLUMN_ID), ids);
        }
        if let Some(entity_id) = &self.entity_id {
            select = select.filter_eq(Column::new(COLUMN_ENTITY_ID), entity_id);
        }
        if let Some(attribute_key) = &self.attribute_key {
            select = select.filter_eq(Column::new(COLUMN_ATTRIBUTE_KEY), attribute_key);
        }
        finish_select(
            select,
            &ATTRIBUTE_COLUMNS,
            self.sort_by.as_deref(),
            self.sort_order,
            self.offset,
            self.limit,
            self.count_only,
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
