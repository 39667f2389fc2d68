// crates/entity-store-core/src/query.rs
// ============================================================================
// Module: Query Builder
// Description: Logical statement descriptions rendered through a dialect.
// Purpose: Build select, insert, update and delete text for the EAV tables.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Statements are described structurally (table, predicates, join, ordering,
//! pagination) and rendered to text by [`SelectQuery::to_sql`] and friends.
//! Values are always rendered as escaped literals by the active dialect;
//! identifiers are always quoted.
//!
//! Supported shape:
//! - equality and `IN` predicates joined with `AND`
//! - at most one `LEFT JOIN` on a column equality
//! - one sort column with direction
//! - optional limit/offset, or a `COUNT(*)` projection

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::dialect::Dialect;

// ============================================================================
// SECTION: Values and Columns
// ============================================================================

/// A literal value embedded in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Text literal.
    Text(String),
    /// Timestamp literal.
    Timestamp(OffsetDateTime),
}

impl SqlValue {
    /// Renders the literal for a dialect.
    fn render(&self, dialect: &dyn Dialect) -> String {
        match self {
            Self::Text(value) => dialect.string_literal(value),
            Self::Timestamp(value) => dialect.timestamp_literal(*value),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<OffsetDateTime> for SqlValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// A column reference, optionally qualified with its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Owning table, when the statement spans more than one table.
    table: Option<String>,
    /// Column name.
    name: String,
}

impl Column {
    /// References an unqualified column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// References a column of a specific table.
    #[must_use]
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Returns the bare column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the column reference.
    fn render(&self, dialect: &dyn Dialect) -> String {
        match &self.table {
            Some(table) => {
                format!(
                    "{}.{}",
                    dialect.quote_identifier(table),
                    dialect.quote_identifier(&self.name)
                )
            }
            None => dialect.quote_identifier(&self.name),
        }
    }
}

// ============================================================================
// SECTION: Predicates and Ordering
// ============================================================================

/// A `WHERE` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = value`.
    Eq(Column, SqlValue),
    /// `column IN (values...)`; an empty set matches nothing.
    In(Column, Vec<SqlValue>),
}

impl Predicate {
    /// Renders the predicate.
    fn render(&self, dialect: &dyn Dialect) -> String {
        match self {
            Self::Eq(column, value) => {
                format!("{} = {}", column.render(dialect), value.render(dialect))
            }
            Self::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Self::In(column, values) => {
                let rendered: Vec<String> =
                    values.iter().map(|value| value.render(dialect)).collect();
                format!("{} IN ({})", column.render(dialect), rendered.join(", "))
            }
        }
    }
}

/// Renders a `WHERE` clause for a predicate list.
fn render_where(predicates: &[Predicate], dialect: &dyn Dialect) -> Option<String> {
    if predicates.is_empty() {
        return None;
    }
    let rendered: Vec<String> =
        predicates.iter().map(|predicate| predicate.render(dialect)).collect();
    Some(format!("WHERE {}", rendered.join(" AND ")))
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unsupported sort order: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Select
// ============================================================================

/// Projection of a select statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    /// `*`
    All,
    /// Selected columns, each with an output alias.
    Columns(Vec<(Column, String)>),
    /// `COUNT(*) AS count`
    Count,
}

/// `LEFT JOIN table ON left = right`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Join {
    /// Joined table.
    table: String,
    /// Left side of the join condition.
    left: Column,
    /// Right side of the join condition.
    right: Column,
}

/// A select statement description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Source table.
    table: String,
    /// Optional left join.
    join: Option<Join>,
    /// `AND`-ed predicates.
    predicates: Vec<Predicate>,
    /// Projection.
    projection: Projection,
    /// Sort column and direction.
    order: Option<(Column, SortOrder)>,
    /// Maximum row count.
    limit: Option<u64>,
    /// Rows to skip.
    offset: Option<u64>,
}

impl SelectQuery {
    /// Starts a `SELECT *` over `table`.
    #[must_use]
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            join: None,
            predicates: Vec::new(),
            projection: Projection::All,
            order: None,
            limit: None,
            offset: None,
        }
    }

    /// Adds `LEFT JOIN table ON left = right`.
    #[must_use]
    pub fn left_join(mut self, table: impl Into<String>, left: Column, right: Column) -> Self {
        self.join = Some(Join {
            table: table.into(),
            left,
            right,
        });
        self
    }

    /// Adds an equality predicate.
    #[must_use]
    pub fn filter_eq(mut self, column: Column, value: impl Into<SqlValue>) -> Self {
        self.predicates.push(Predicate::Eq(column, value.into()));
        self
    }

    /// Adds an `IN` predicate.
    #[must_use]
    pub fn filter_in<I, V>(mut self, column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.predicates.push(Predicate::In(column, values.into_iter().map(Into::into).collect()));
        self
    }

    /// Projects one column under an alias.
    #[must_use]
    pub fn select_column(mut self, column: Column, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match &mut self.projection {
            Projection::Columns(columns) => columns.push((column, alias)),
            _ => self.projection = Projection::Columns(vec![(column, alias)]),
        }
        self
    }

    /// Projects `COUNT(*) AS count`.
    #[must_use]
    pub fn count(mut self) -> Self {
        self.projection = Projection::Count;
        self
    }

    /// Sets the sort column and direction.
    #[must_use]
    pub fn order_by(mut self, column: Column, order: SortOrder) -> Self {
        self.order = Some((column, order));
        self
    }

    /// Sets the maximum number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the statement text.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let projection = match &self.projection {
            Projection::All => "*".to_string(),
            Projection::Count => format!("COUNT(*) AS {}", dialect.quote_identifier("count")),
            Projection::Columns(columns) => columns
                .iter()
                .map(|(column, alias)| {
                    format!("{} AS {}", column.render(dialect), dialect.quote_identifier(alias))
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        let mut parts =
            vec![format!("SELECT {projection} FROM {}", dialect.quote_identifier(&self.table))];
        if let Some(join) = &self.join {
            parts.push(format!(
                "LEFT JOIN {} ON {} = {}",
                dialect.quote_identifier(&join.table),
                join.left.render(dialect),
                join.right.render(dialect)
            ));
        }
        if let Some(clause) = render_where(&self.predicates, dialect) {
            parts.push(clause);
        }
        if self.projection != Projection::Count {
            if let Some((column, order)) = &self.order {
                parts.push(format!("ORDER BY {} {}", column.render(dialect), order.as_sql()));
            }
            if let Some(clause) = dialect.limit_clause(self.limit, self.offset) {
                parts.push(clause);
            }
        }
        parts.join(" ")
    }
}

// ============================================================================
// SECTION: Insert / Update / Delete
// ============================================================================

/// An `INSERT` of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Target table.
    table: String,
    /// Column/value pairs in column order.
    values: Vec<(String, SqlValue)>,
}

impl InsertStatement {
    /// Starts an insert into `table`.
    #[must_use]
    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Renders the statement text.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let columns: Vec<String> =
            self.values.iter().map(|(column, _)| dialect.quote_identifier(column)).collect();
        let values: Vec<String> =
            self.values.iter().map(|(_, value)| value.render(dialect)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_identifier(&self.table),
            columns.join(", "),
            values.join(", ")
        )
    }
}

/// An `UPDATE` of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    /// Target table.
    table: String,
    /// Column assignments.
    assignments: Vec<(String, SqlValue)>,
    /// `AND`-ed predicates.
    predicates: Vec<Predicate>,
}

impl UpdateStatement {
    /// Starts an update of `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Adds a column assignment.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Adds an equality predicate.
    #[must_use]
    pub fn filter_eq(mut self, column: Column, value: impl Into<SqlValue>) -> Self {
        self.predicates.push(Predicate::Eq(column, value.into()));
        self
    }

    /// Renders the statement text.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, value)| {
                format!("{} = {}", dialect.quote_identifier(column), value.render(dialect))
            })
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(&self.table),
            assignments.join(", ")
        );
        if let Some(clause) = render_where(&self.predicates, dialect) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        sql
    }
}

/// A `DELETE` of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStatement {
    /// Target table.
    table: String,
    /// `AND`-ed predicates.
    predicates: Vec<Predicate>,
}

impl DeleteStatement {
    /// Starts a delete from `table`.
    #[must_use]
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    /// Adds an equality predicate.
    #[must_use]
    pub fn filter_eq(mut self, column: Column, value: impl Into<SqlValue>) -> Self {
        self.predicates.push(Predicate::Eq(column, value.into()));
        self
    }

    /// Renders the statement text.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(&self.table));
        if let Some(clause) = render_where(&self.predicates, dialect) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        sql
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::Column;
    use super::DeleteStatement;
    use super::InsertStatement;
    use super::SelectQuery;
    use super::SortOrder;
    use super::UpdateStatement;
    use crate::dialect::DialectKind;

    #[test]
    fn select_with_filters_sort_and_pagination() {
        let query = SelectQuery::from("entities")
            .filter_eq(Column::new("entity_type"), "post")
            .filter_in(Column::new("id"), ["a", "b"])
            .order_by(Column::new("id"), SortOrder::Desc)
            .limit(10)
            .offset(20);
        assert_eq!(
            query.to_sql(DialectKind::Sqlite.dialect().as_ref()),
            "SELECT * FROM \"entities\" WHERE \"entity_type\" = 'post' AND \"id\" IN ('a', 'b') \
             ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            query.to_sql(DialectKind::Mysql.dialect().as_ref()),
            "SELECT * FROM `entities` WHERE `entity_type` = 'post' AND `id` IN ('a', 'b') ORDER \
             BY `id` DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn empty_in_set_matches_nothing() {
        let query = SelectQuery::from("t").filter_in(Column::new("id"), Vec::<String>::new());
        assert_eq!(
            query.to_sql(DialectKind::Postgres.dialect().as_ref()),
            "SELECT * FROM \"t\" WHERE 1 = 0"
        );
    }

    #[test]
    fn count_drops_ordering_and_pagination() {
        let query = SelectQuery::from("entities")
            .filter_eq(Column::new("entity_type"), "post")
            .order_by(Column::new("id"), SortOrder::Asc)
            .limit(1)
            .count();
        assert_eq!(
            query.to_sql(DialectKind::Postgres.dialect().as_ref()),
            "SELECT COUNT(*) AS \"count\" FROM \"entities\" WHERE \"entity_type\" = 'post'"
        );
    }

    #[test]
    fn join_projects_qualified_columns() {
        let query = SelectQuery::from("attrs")
            .left_join(
                "ents",
                Column::qualified("attrs", "entity_id"),
                Column::qualified("ents", "id"),
            )
            .filter_eq(Column::qualified("ents", "entity_type"), "page")
            .select_column(Column::qualified("attrs", "entity_id"), "entity_id");
        assert_eq!(
            query.to_sql(DialectKind::Sqlite.dialect().as_ref()),
            "SELECT \"attrs\".\"entity_id\" AS \"entity_id\" FROM \"attrs\" LEFT JOIN \"ents\" ON \
             \"attrs\".\"entity_id\" = \"ents\".\"id\" WHERE \"ents\".\"entity_type\" = 'page'"
        );
    }

    #[test]
    fn insert_update_delete_render_literals() {
        let at = datetime!(2024-05-06 07:08:09 UTC);
        let dialect = DialectKind::Postgres.dialect();
        assert_eq!(
            InsertStatement::into_table("attrs")
                .value("id", "1")
                .value("attribute_value", "O'Brien")
                .value("created_at", at)
                .to_sql(dialect.as_ref()),
            "INSERT INTO \"attrs\" (\"id\", \"attribute_value\", \"created_at\") VALUES ('1', \
             'O''Brien', '2024-05-06 07:08:09+00:00')"
        );
        assert_eq!(
            UpdateStatement::table("attrs")
                .set("attribute_value", "v")
                .filter_eq(Column::new("id"), "1")
                .to_sql(dialect.as_ref()),
            "UPDATE \"attrs\" SET \"attribute_value\" = 'v' WHERE \"id\" = '1'"
        );
        assert_eq!(
            DeleteStatement::from("attrs")
                .filter_eq(Column::new("entity_id"), "e")
                .to_sql(dialect.as_ref()),
            "DELETE FROM \"attrs\" WHERE \"entity_id\" = 'e'"
        );
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortOrder>().ok(), Some(SortOrder::Desc));
        assert_eq!("asc".parse::<SortOrder>().ok(), Some(SortOrder::Asc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
