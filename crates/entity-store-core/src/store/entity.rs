// crates/entity-store-core/src/store/entity.rs
// ============================================================================
// Module: Entity Operations
// Description: Entity CRUD, attribute-based lookup, delete and trash.
// Purpose: Manage entities together with the attributes they own.
// Dependencies: crate::filter, crate::query, crate::model
// ============================================================================

//! ## Overview
//! Entities own their attributes: hard delete removes both in one
//! transaction, and trash copies both into the trash tables before removing
//! the live rows. Lookups by attribute join the attribute table to the
//! entity table on `entity_id = id`.
//!
//! Trash is one-way. Trashed rows are only visible through
//! [`Scope::entity_trash_find`] and [`Scope::attribute_trash_list`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::filter::EntityQuery;
use crate::identifiers::generate_id;
use crate::model::Entity;
use crate::model::EntityTrash;
use crate::query::Column;
use crate::query::DeleteStatement;
use crate::query::InsertStatement;
use crate::query::SelectQuery;
use crate::query::SortOrder;
use crate::query::UpdateStatement;
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
use crate::store::Store;
use crate::store::scope::Scope;
use crate::store::scope::require;
use crate::timestamp;

// ============================================================================
// SECTION: Scope Operations
// ============================================================================

impl Scope<'_> {
    /// Creates an entity of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_type` is empty.
    pub fn entity_create(&mut self, entity_type: &str) -> Result<Entity, StoreError> {
        self.entity_insert(Entity::new(entity_type))
    }

    /// Creates an entity of `entity_type` with a handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_type` is empty.
    pub fn entity_create_with_handle(
        &mut self,
        entity_type: &str,
        entity_handle: &str,
    ) -> Result<Entity, StoreError> {
        self.entity_insert(Entity::new(entity_type).with_handle(entity_handle))
    }

    /// Persists a caller-built entity, assigning id and timestamps when
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the type is empty, and
    /// [`StoreError::Backend`] when the insert fails.
    pub fn entity_insert(&mut self, mut entity: Entity) -> Result<Entity, StoreError> {
        require("entity type", &entity.entity_type)?;
        if entity.id.is_empty() {
            entity.id = generate_id();
        }
        entity.created_at = timestamp::or_now(entity.created_at);
        entity.updated_at = timestamp::or_now(entity.updated_at);
        let statement = InsertStatement::into_table(&self.tables().entities)
            .value(COLUMN_ID, &entity.id)
            .value(COLUMN_ENTITY_TYPE, &entity.entity_type)
            .value(COLUMN_ENTITY_HANDLE, &entity.entity_handle)
            .value(COLUMN_CREATED_AT, entity.created_at)
            .value(COLUMN_UPDATED_AT, entity.updated_at)
            .to_sql(self.dialect());
        self.execute("entity_insert", &statement)?;
        Ok(entity)
    }

    /// Creates an entity and its attributes on the current executor.
    ///
    /// # Errors
    ///
    /// Returns the first insert error; see
    /// [`Store::entity_create_with_attributes`] for the atomic variant.
    pub fn entity_create_with_attributes<K, V>(
        &mut self,
        entity_type: &str,
        attributes: &[(K, V)],
    ) -> Result<Entity, StoreError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entity = self.entity_create(entity_type)?;
        for (key, value) in attributes {
            self.attribute_create(&entity.id, key.as_ref(), value.as_ref())?;
        }
        Ok(entity)
    }

    /// Finds an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `id` is empty.
    pub fn entity_find_by_id(&mut self, id: &str) -> Result<Option<Entity>, StoreError> {
        require("entity id", id)?;
        Ok(self.entity_list(&EntityQuery::by_id(id).with_limit(1))?.pop())
    }

    /// Finds an entity by type and handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when either argument is empty.
    pub fn entity_find_by_handle(
        &mut self,
        entity_type: &str,
        entity_handle: &str,
    ) -> Result<Option<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("entity handle", entity_handle)?;
        let query = EntityQuery {
            entity_type: Some(entity_type.to_string()),
            entity_handle: Some(entity_handle.to_string()),
            limit: Some(1),
            ..EntityQuery::default()
        };
        Ok(self.entity_list(&query)?.pop())
    }

    /// Finds the first entity of `entity_type` whose attribute `key` equals
    /// `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_type` or `key` is
    /// empty.
    pub fn entity_find_by_attribute(
        &mut self,
        entity_type: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("attribute key", key)?;
        let ids = self.entity_ids_by_attribute(entity_type, key, value, Some(1))?;
        match ids.first() {
            Some(id) => self.entity_find_by_id(id),
            None => Ok(None),
        }
    }

    /// Lists entities matching `query`. `count_only` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an unknown sort column.
    pub fn entity_list(&mut self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        let query = EntityQuery {
            count_only: false,
            ..query.clone()
        };
        let statement = query.to_select(&self.tables().entities)?.to_sql(self.dialect());
        let rows = self.query("entity_list", &statement)?;
        rows.iter().map(Entity::from_row).collect()
    }

    /// Lists every entity of `entity_type` whose attribute `key` equals
    /// `value`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `entity_type` or `key` is
    /// empty.
    pub fn entity_list_by_attribute(
        &mut self,
        entity_type: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("attribute key", key)?;
        let ids: BTreeSet<String> =
            self.entity_ids_by_attribute(entity_type, key, value, None)?.into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.entity_list(&EntityQuery::by_ids(ids))
    }

    /// Counts entities matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an unknown sort column.
    pub fn entity_count(&mut self, query: &EntityQuery) -> Result<u64, StoreError> {
        if query.matches_nothing() {
            return Ok(0);
        }
        let query = EntityQuery {
            count_only: true,
            ..query.clone()
        };
        let statement = query.to_select(&self.tables().entities)?.to_sql(self.dialect());
        self.query_count("entity_count", &statement)
    }

    /// Persists type and handle of an identified entity and refreshes
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the id or type is empty.
    pub fn entity_update(&mut self, entity: &mut Entity) -> Result<bool, StoreError> {
        require("entity id", &entity.id)?;
        require("entity type", &entity.entity_type)?;
        entity.updated_at = timestamp::now();
        let statement = UpdateStatement::table(&self.tables().entities)
            .set(COLUMN_ENTITY_TYPE, &entity.entity_type)
            .set(COLUMN_ENTITY_HANDLE, &entity.entity_handle)
            .set(COLUMN_UPDATED_AT, entity.updated_at)
            .filter_eq(Column::new(COLUMN_ID), &entity.id)
            .to_sql(self.dialect());
        self.execute("entity_update", &statement)?;
        Ok(true)
    }

    /// Deletes the attributes of `id`, then the entity row.
    ///
    /// Returns true when the entity row existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `id` is empty, or the first
    /// failing delete.
    pub fn entity_delete(&mut self, id: &str) -> Result<bool, StoreError> {
        require("entity id", id)?;
        let attributes = DeleteStatement::from(&self.tables().attributes)
            .filter_eq(Column::new(COLUMN_ENTITY_ID), id)
            .to_sql(self.dialect());
        self.execute("entity_delete", &attributes)?;
        let entity = DeleteStatement::from(&self.tables().entities)
            .filter_eq(Column::new(COLUMN_ID), id)
            .to_sql(self.dialect());
        Ok(self.execute("entity_delete", &entity)? > 0)
    }

    /// Moves an entity and its attributes to the trash tables.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_trash_by`].
    pub fn entity_trash(&mut self, id: &str) -> Result<bool, StoreError> {
        self.entity_trash_by(id, "")
    }

    /// Moves an entity and its attributes to the trash tables, recording
    /// `deleted_by`.
    ///
    /// Returns false when no live entity has `id`; nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `id` is empty, or the first
    /// failing statement.
    pub fn entity_trash_by(&mut self, id: &str, deleted_by: &str) -> Result<bool, StoreError> {
        require("entity id", id)?;
        let Some(entity) = self.entity_find_by_id(id)? else {
            return Ok(false);
        };
        let deleted_at = timestamp::now();
        let statement = InsertStatement::into_table(&self.tables().entities_trash)
            .value(COLUMN_ID, &entity.id)
            .value(COLUMN_ENTITY_TYPE, &entity.entity_type)
            .value(COLUMN_ENTITY_HANDLE, &entity.entity_handle)
            .value(COLUMN_CREATED_AT, entity.created_at)
            .value(COLUMN_UPDATED_AT, entity.updated_at)
            .value(COLUMN_DELETED_AT, deleted_at)
            .value(COLUMN_DELETED_BY, deleted_by)
            .to_sql(self.dialect());
        self.execute("entity_trash", &statement)?;

        for attribute in self.entity_attribute_list(id)? {
            let statement = InsertStatement::into_table(&self.tables().attributes_trash)
                .value(COLUMN_ID, &attribute.id)
                .value(COLUMN_ENTITY_ID, &attribute.entity_id)
                .value(COLUMN_ATTRIBUTE_KEY, &attribute.attribute_key)
                .value(COLUMN_ATTRIBUTE_VALUE, &attribute.attribute_value)
                .value(COLUMN_CREATED_AT, attribute.created_at)
                .value(COLUMN_UPDATED_AT, attribute.updated_at)
                .value(COLUMN_DELETED_AT, deleted_at)
                .value(COLUMN_DELETED_BY, deleted_by)
                .to_sql(self.dialect());
            self.execute("entity_trash", &statement)?;
        }

        let attributes = DeleteStatement::from(&self.tables().attributes)
            .filter_eq(Column::new(COLUMN_ENTITY_ID), id)
            .to_sql(self.dialect());
        self.execute("entity_trash", &attributes)?;
        let live = DeleteStatement::from(&self.tables().entities)
            .filter_eq(Column::new(COLUMN_ID), id)
            .to_sql(self.dialect());
        self.execute("entity_trash", &live)?;
        Ok(true)
    }

    /// Finds the most recent trash copy of entity `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `id` is empty.
    pub fn entity_trash_find(&mut self, id: &str) -> Result<Option<EntityTrash>, StoreError> {
        require("entity id", id)?;
        let statement = SelectQuery::from(&self.tables().entities_trash)
            .filter_eq(Column::new(COLUMN_ID), id)
            .order_by(Column::new(COLUMN_DELETED_AT), SortOrder::Desc)
            .limit(1)
            .to_sql(self.dialect());
        let rows = self.query("entity_trash_find", &statement)?;
        rows.first().map(EntityTrash::from_row).transpose()
    }

    /// Resolves entity ids through the attribute/entity join.
    fn entity_ids_by_attribute(
        &mut self,
        entity_type: &str,
        key: &str,
        value: &str,
        limit: Option<u64>,
    ) -> Result<Vec<String>, StoreError> {
        let tables = self.tables();
        let mut select = SelectQuery::from(&tables.attributes)
            .left_join(
                &tables.entities,
                Column::qualified(&tables.attributes, COLUMN_ENTITY_ID),
                Column::qualified(&tables.entities, COLUMN_ID),
            )
            .filter_eq(Column::qualified(&tables.entities, COLUMN_ENTITY_TYPE), entity_type)
            .filter_eq(Column::qualified(&tables.attributes, COLUMN_ATTRIBUTE_KEY), key)
            .filter_eq(Column::qualified(&tables.attributes, COLUMN_ATTRIBUTE_VALUE), value)
            .select_column(
                Column::qualified(&tables.attributes, COLUMN_ENTITY_ID),
                COLUMN_ENTITY_ID,
            )
            .order_by(Column::qualified(&tables.attributes, COLUMN_ENTITY_ID), SortOrder::Asc);
        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        let statement = select.to_sql(self.dialect());
        let rows = self.query("entity_find_by_attribute", &statement)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(COLUMN_ENTITY_ID))
            .map(str::to_string)
            .collect())
    }
}

// ============================================================================
// SECTION: Store Operations
// ============================================================================

impl Store {
    /// Creates an entity of `entity_type`.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_create`].
    pub fn entity_create(&self, entity_type: &str) -> Result<Entity, StoreError> {
        require("entity type", entity_type)?;
        self.with_scope(|scope| scope.entity_create(entity_type))
    }

    /// Creates an entity of `entity_type` with a handle.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_create_with_handle`].
    pub fn entity_create_with_handle(
        &self,
        entity_type: &str,
        entity_handle: &str,
    ) -> Result<Entity, StoreError> {
        require("entity type", entity_type)?;
        self.with_scope(|scope| scope.entity_create_with_handle(entity_type, entity_handle))
    }

    /// Persists a caller-built entity.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_insert`].
    pub fn entity_insert(&self, entity: Entity) -> Result<Entity, StoreError> {
        require("entity type", &entity.entity_type)?;
        self.with_scope(|scope| scope.entity_insert(entity))
    }

    /// Creates an entity and its attributes in one transaction; an attribute
    /// failure leaves no entity behind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the type or any key is empty
    /// (before the transaction opens), or the first insert error.
    pub fn entity_create_with_attributes<I, K, V>(
        &self,
        entity_type: &str,
        attributes: I,
    ) -> Result<Entity, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        require("entity type", entity_type)?;
        let attributes: Vec<(K, V)> = attributes.into_iter().collect();
        for (key, _) in &attributes {
            require("attribute key", key.as_ref())?;
        }
        self.transaction("entity_create_with_attributes", |scope| {
            scope.entity_create_with_attributes(entity_type, &attributes)
        })
    }

    /// Finds an entity by id.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_find_by_id`].
    pub fn entity_find_by_id(&self, id: &str) -> Result<Option<Entity>, StoreError> {
        require("entity id", id)?;
        self.with_scope(|scope| scope.entity_find_by_id(id))
    }

    /// Finds an entity by type and handle.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_find_by_handle`].
    pub fn entity_find_by_handle(
        &self,
        entity_type: &str,
        entity_handle: &str,
    ) -> Result<Option<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("entity handle", entity_handle)?;
        self.with_scope(|scope| scope.entity_find_by_handle(entity_type, entity_handle))
    }

    /// Finds an entity by attribute value.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_find_by_attribute`].
    pub fn entity_find_by_attribute(
        &self,
        entity_type: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.entity_find_by_attribute(entity_type, key, value))
    }

    /// Lists entities matching `query`.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_list`].
    pub fn entity_list(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        self.with_scope(|scope| scope.entity_list(query))
    }

    /// Lists entities by attribute value.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_list_by_attribute`].
    pub fn entity_list_by_attribute(
        &self,
        entity_type: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<Entity>, StoreError> {
        require("entity type", entity_type)?;
        require("attribute key", key)?;
        self.with_scope(|scope| scope.entity_list_by_attribute(entity_type, key, value))
    }

    /// Counts entities matching `query`.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_count`].
    pub fn entity_count(&self, query: &EntityQuery) -> Result<u64, StoreError> {
        if query.matches_nothing() {
            return Ok(0);
        }
        self.with_scope(|scope| scope.entity_count(query))
    }

    /// Persists type and handle of an identified entity.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_update`].
    pub fn entity_update(&self, entity: &mut Entity) -> Result<bool, StoreError> {
        require("entity id", &entity.id)?;
        require("entity type", &entity.entity_type)?;
        self.with_scope(|scope| scope.entity_update(entity))
    }

    /// Deletes an entity and its attributes in one transaction.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_delete`].
    pub fn entity_delete(&self, id: &str) -> Result<bool, StoreError> {
        require("entity id", id)?;
        self.transaction("entity_delete", |scope| scope.entity_delete(id))
    }

    /// Moves an entity and its attributes to the trash in one transaction.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_trash_by`].
    pub fn entity_trash(&self, id: &str) -> Result<bool, StoreError> {
        self.entity_trash_by(id, "")
    }

    /// Moves an entity and its attributes to the trash in one transaction,
    /// recording `deleted_by`.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_trash_by`].
    pub fn entity_trash_by(&self, id: &str, deleted_by: &str) -> Result<bool, StoreError> {
        require("entity id", id)?;
        self.transaction("entity_trash", |scope| scope.entity_trash_by(id, deleted_by))
    }

    /// Finds the most recent trash copy of entity `id`.
    ///
    /// # Errors
    ///
    /// See [`Scope::entity_trash_find`].
    pub fn entity_trash_find(&self, id: &str) -> Result<Option<EntityTrash>, StoreError> {
        require("entity id", id)?;
        self.with_scope(|scope| scope.entity_trash_find(id))
    }
}
