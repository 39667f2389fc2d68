// crates/entity-store-core/src/store/attribute.rs
// ============================================================================
// Module: Attribute Operations
// Description: Create, find, list, upsert and typed access for attributes.
// Purpose: Maintain one value per (entity, key) over the attribute table.
// Dependencies: crate::codec, crate::filter, crate::query
// ============================================================================

//! ## Overview
//! Attribute writes use find-before-write: [`Scope::attribute_set`] looks up
//! the `(entity_id, attribute_key)` pair and either inserts a new row or
//! updates the existing one. No database constraint backs this, so two
//! writers racing on the same pair rely on the backend's isolation.
//!
//! Values are stored as text; numeric setters and getters go through the
//! codec in [`crate::codec`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::codec::AttributeValue;
use crate::codec::decode_float;
use crate::codec::decode_int;
use crate::error::StoreError;
use crate::filter::AttributeQuery;
use crate::identifiers::generate_id;
use crate::model::Attribute;
use crate::model::AttributeTrash;
use crate::query::Column;
use crate::query::InsertStatement;
use crate::query::SelectQuery;
use crate::query::SortOrder;
use crate::query::UpdateStatement;
use crate::schema::COLUMN_ATTRIBUTE_KEY;
use crate::schema::COLUMN_ATTRIBUTE_VALUE;
use crate::schema::COLUMN_CREATED_AT;
use crate::schema::COLUMN_ENTITY_ID;
use crate::schema::COLUMN_ID;
use crate::schema::COLUMN_UPDATED_AT;
use crate::store::Store;
use crate::store::scope::Scope;
use crate::store::scope::require;
use crate::timestamp;

// ============================================================================
// SECTION: Scope Operations
// ============================================================================

impl Scope<'_> {
    /// Creates an attribute on `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_id` or `key` is empty,
    /// and [`StoreError::Backend`] when the insert fails.
    pub fn attribute_create(
        &mut self,
        entity_id: &str,
        key: &str,
        value: &str,
    ) -> Result<Attribute, StoreError> {
        self.attribute_insert(Attribute::new(entity_id, key, value))
    }

    /// Persists a caller-built attribute, assigning id and timestamps when
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the entity id or key is empty,
    /// and [`StoreError::Backend`] when the insert fails.
    pub fn attribute_insert(&mut self, mut attribute: Attribute) -> Result<Attribute, StoreError> {
        require("entity id", &attribute.entity_id)?;
        require("attribute key", &attribute.attribute_key)?;
        if attribute.id.is_empty() {
            attribute.id = generate_id();
        }
        attribute.created_at = timestamp::or_now(attribute.created_at);
        attribute.updated_at = timestamp::or_now(attribute.updated_at);
        let statement = InsertStatement::into_table(&self.tables().attributes)
            .value(COLUMN_ID, &attribute.id)
            .value(COLUMN_ENTITY_ID, &attribute.entity_id)
            .value(COLUMN_ATTRIBUTE_KEY, &attribute.attribute_key)
            .value(COLUMN_ATTRIBUTE_VALUE, &attribute.attribute_value)
            .value(COLUMN_CREATED_AT, attribute.created_at)
            .value(COLUMN_UPDATED_AT, attribute.updated_at)
            .to_sql(self.dialect());
        self.execute("attribute_insert", &statement)?;
        Ok(attribute)
    }

    /// Finds the attribute stored under `key` for `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when either argument is empty.
    pub fn attribute_find(
        &mut self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        let query = AttributeQuery::by_entity_key(entity_id, key).with_limit(1);
        Ok(self.attribute_list(&query)?.pop())
    }

    /// Finds an attribute of the entity identified by type and handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when any argument is empty.
    pub fn attribute_find_by_handle(
        &mut self,
        entity_type: &str,
        entity_handle: &str,
        key: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        require("attribute key", key)?;
        let Some(entity) = self.entity_find_by_handle(entity_type, entity_handle)? else {
            return Ok(None);
        };
        self.attribute_find(&entity.id, key)
    }

    /// Lists attributes matching `query`. `count_only` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an unknown sort column.
    pub fn attribute_list(&mut self, query: &AttributeQuery) -> Result<Vec<Attribute>, StoreError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        let query = AttributeQuery {
            count_only: false,
            ..query.clone()
        };
        let statement = query.to_select(&self.tables().attributes)?.to_sql(self.dialect());
        let rows = self.query("attribute_list", &statement)?;
        rows.iter().map(Attribute::from_row).collect()
    }

    /// Counts attributes matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an unknown sort column.
    pub fn attribute_count(&mut self, query: &AttributeQuery) -> Result<u64, StoreError> {
        if query.matches_nothing() {
            return Ok(0);
        }
        let query = AttributeQuery {
            count_only: true,
            ..query.clone()
        };
        let statement = query.to_select(&self.tables().attributes)?.to_sql(self.dialect());
        self.query_count("attribute_count", &statement)
    }

    /// Lists every attribute of `entity_id` ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_id` is empty.
    pub fn entity_attribute_list(&mut self, entity_id: &str) -> Result<Vec<Attribute>, StoreError> {
        require("entity id", entity_id)?;
        self.attribute_list(
            &AttributeQuery::by_entity(entity_id).sorted_by(COLUMN_ATTRIBUTE_KEY, SortOrder::Asc),
        )
    }

    /// Stores `value` under `key`, inserting or updating as needed.
    ///
    /// Returns true when a row holds the value afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_id` or `key` is empty.
    pub fn attribute_set(
        &mut self,
        entity_id: &str,
        key: &str,
        value: &AttributeValue,
    ) -> Result<bool, StoreError> {
        let encoded = value.encode();
        match self.attribute_find(entity_id, key)? {
            None => {
                self.attribute_create(entity_id, key, &encoded)?;
                Ok(true)
            }
            Some(mut attribute) => {
                attribute.attribute_value = encoded;
                self.attribute_update(&mut attribute)
            }
        }
    }

    /// Stores a string value.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_string(
        &mut self,
        entity_id: &str,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::from(value))
    }

    /// Stores an `int64` value.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_int(
        &mut self,
        entity_id: &str,
        key: &str,
        value: i64,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::Int(value))
    }

    /// Stores a `float64` value.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_float(
        &mut self,
        entity_id: &str,
        key: &str,
        value: f64,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::Float(value))
    }

    /// Stores every `(key, value)` pair as a string.
    ///
    /// Runs on the current executor; use [`Store::attributes_set`] for the
    /// all-or-nothing variant.
    ///
    /// # Errors
    ///
    /// Stops at the first failing key and returns its error.
    pub fn attributes_set<K, V>(
        &mut self,
        entity_id: &str,
        values: &[(K, V)],
    ) -> Result<bool, StoreError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in values {
            self.attribute_set_string(entity_id, key.as_ref(), value.as_ref())?;
        }
        Ok(true)
    }

    /// Persists every field of an identified attribute and refreshes
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the id or key is empty.
    pub fn attribute_update(&mut self, attribute: &mut Attribute) -> Result<bool, StoreError> {
        require("attribute id", &attribute.id)?;
        require("attribute key", &attribute.attribute_key)?;
        attribute.created_at = timestamp::or_now(attribute.created_at);
        attribute.updated_at = timestamp::now();
        let statement = UpdateStatement::table(&self.tables().attributes)
            .set(COLUMN_ENTITY_ID, &attribute.entity_id)
            .set(COLUMN_ATTRIBUTE_KEY, &attribute.attribute_key)
            .set(COLUMN_ATTRIBUTE_VALUE, &attribute.attribute_value)
            .set(COLUMN_CREATED_AT, attribute.created_at)
            .set(COLUMN_UPDATED_AT, attribute.updated_at)
            .filter_eq(Column::new(COLUMN_ID), &attribute.id)
            .to_sql(self.dialect());
        self.execute("attribute_update", &statement)?;
        Ok(true)
    }

    /// Returns the string value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when either argument is empty.
    pub fn attribute_get_string(
        &mut self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.attribute_find(entity_id, key)?.map(|attribute| attribute.attribute_value))
    }

    /// Returns the `int64` value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] when the stored text is not an integer.
    pub fn attribute_get_int(
        &mut self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<i64>, StoreError> {
        self.attribute_get_string(entity_id, key)?
            .map(|value| decode_int(&value).map_err(StoreError::from))
            .transpose()
    }

    /// Returns the `float64` value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] when the stored text is not a float.
    pub fn attribute_get_float(
        &mut self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<f64>, StoreError> {
        self.attribute_get_string(entity_id, key)?
            .map(|value| decode_float(&value).map_err(StoreError::from))
            .transpose()
    }

    /// Lists archived attributes of `entity_id` ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_id` is empty.
    pub fn attribute_trash_list(
        &mut self,
        entity_id: &str,
    ) -> Result<Vec<AttributeTrash>, StoreError> {
        require("entity id", entity_id)?;
        let statement = SelectQuery::from(&self.tables().attributes_trash)
            .filter_eq(Column::new(COLUMN_ENTITY_ID), entity_id)
            .order_by(Column::new(COLUMN_ATTRIBUTE_KEY), SortOrder::Asc)
            .to_sql(self.dialect());
        let rows = self.query("attribute_trash_list", &statement)?;
        rows.iter().map(AttributeTrash::from_row).collect()
    }
}

// ============================================================================
// SECTION: Store Operations
// ============================================================================

impl Store {
    /// Creates an attribute on `entity_id`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_create`].
    pub fn attribute_create(
        &self,
        entity_id: &str,
        key: &str,
        value: &str,
    ) -> Result<Attribute, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_create(entity_id, key, value))
    }

    /// Persists a caller-built attribute.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_insert`].
    pub fn attribute_insert(&self, attribute: Attribute) -> Result<Attribute, StoreError> {
        require("entity id", &attribute.entity_id)?;
        require("attribute key", &attribute.attribute_key)?;
        self.with_scope(|scope| scope.attribute_insert(attribute))
    }

    /// Finds the attribute stored under `key` for `entity_id`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_find`].
    pub fn attribute_find(
        &self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_find(entity_id, key))
    }

    /// Finds an attribute of the entity identified by type and handle.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_find_by_handle`].
    pub fn attribute_find_by_handle(
        &self,
        entity_type: &str,
        entity_handle: &str,
        key: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        require("entity type", entity_type)?;
        require("entity handle", entity_handle)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_find_by_handle(entity_type, entity_handle, key))
    }

    /// Lists attributes matching `query`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_list`].
    pub fn attribute_list(&self, query: &AttributeQuery) -> Result<Vec<Attribute>, StoreError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        self.with_scope(|scope| scope.attribute_list(query))
    }

    /// Counts attributes matching `query`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_count`].
    pub fn attribute_count(&self, query: &AttributeQuery) -> Result<u64, StoreError> {
        if query.matches_nothing() {
            return Ok(0);
        }
        self.with_scope(|scope| scope.attribute_count(query))
    }

    /// Lists every attribute of `entity_id` ordered by key.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_attribute_list`].
    pub fn entity_attribute_list(&self, entity_id: &str) -> Result<Vec<Attribute>, StoreError> {
        require("entity id", entity_id)?;
        self.with_scope(|scope| scope.entity_attribute_list(entity_id))
    }

    /// Stores a tagged value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set(
        &self,
        entity_id: &str,
        key: &str,
        value: &AttributeValue,
    ) -> Result<bool, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_set(entity_id, key, value))
    }

    /// Stores a string value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_string(
        &self,
        entity_id: &str,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::from(value))
    }

    /// Stores an `int64` value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_int(
        &self,
        entity_id: &str,
        key: &str,
        value: i64,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::Int(value))
    }

    /// Stores a `float64` value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_set`].
    pub fn attribute_set_float(
        &self,
        entity_id: &str,
        key: &str,
        value: f64,
    ) -> Result<bool, StoreError> {
        self.attribute_set(entity_id, key, &AttributeValue::Float(value))
    }

    /// Stores every `(key, value)` pair in one transaction; either all keys
    /// are written or none are.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_id` or any key is
    /// empty (before the transaction opens), or the first write error.
    pub fn attributes_set<I, K, V>(&self, entity_id: &str, values: I) -> Result<bool, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        require("entity id", entity_id)?;
        let values: Vec<(K, V)> = values.into_iter().collect();
        for (key, _) in &values {
            require("attribute key", key.as_ref())?;
        }
        if values.is_empty() {
            return Ok(true);
        }
        self.transaction("attributes_set", |scope| scope.attributes_set(entity_id, &values))
    }

    /// Persists every field of an identified attribute.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_update`].
    pub fn attribute_update(&self, attribute: &mut Attribute) -> Result<bool, StoreError> {
        require("attribute id", &attribute.id)?;
        require("attribute key", &attribute.attribute_key)?;
        self.with_scope(|scope| scope.attribute_update(attribute))
    }

    /// Returns the string value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_get_string`].
    pub fn attribute_get_string(
        &self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_get_string(entity_id, key))
    }

    /// Returns the `int64` value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_get_int`].
    pub fn attribute_get_int(&self, entity_id: &str, key: &str) -> Result<Option<i64>, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_get_int(entity_id, key))
    }

    /// Returns the `float64` value under `key`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_get_float`].
    pub fn attribute_get_float(
        &self,
        entity_id: &str,
        key: &str,
    ) -> Result<Option<f64>, StoreError> {
        require("entity id", entity_id)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.attribute_get_float(entity_id, key))
    }

    /// Lists archived attributes of `entity_id`.
    ///
    /// # Errors
    ///
    /// See [`Scope::attribute_trash_list`].
    pub fn attribute_trash_list(&self, entity_id: &str) -> Result<Vec<AttributeTrash>, StoreError> {
        require("entity id", entity_id)?;
        self.with_scope(|scope| scope.attribute_trash_list(entity_id))
    }
}
