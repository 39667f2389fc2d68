// crates/entity-store-core/src/dialect.rs
// ============================================================================
// Module: SQL Dialects
// Description: Identifier quoting, literals and column types per engine.
// Purpose: Isolate backend-specific statement text behind one interface.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Dialect`] is selected once when the store is built and then used for
//! every statement. Three families are supported:
//! - `MySQL`: backtick identifiers, backslash-escaping string literals,
//!   `datetime` columns.
//! - `PostgreSQL`: double-quoted identifiers, `timestamptz(6)` columns and
//!   explicit UTC offsets on timestamp literals.
//! - `SQLite`: double-quoted identifiers, `datetime` columns.
//!
//! Business operations never branch on the dialect; they only call into the
//! trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::ConfigError;
use crate::timestamp::format_datetime;

// ============================================================================
// SECTION: Dialect Kind
// ============================================================================

/// Supported dialect families.
///
/// # Invariants
/// - Labels are stable and used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    /// `MySQL` / `MariaDB` family.
    Mysql,
    /// `PostgreSQL` family.
    Postgres,
    /// `SQLite`.
    Sqlite,
}

impl DialectKind {
    /// Returns the stable label for the dialect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Infers the dialect from a backend driver name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the driver is not recognized.
    pub fn from_driver_name(driver: &str) -> Result<Self, ConfigError> {
        let driver = driver.to_ascii_lowercase();
        if driver.contains("mysql") || driver.contains("mariadb") {
            return Ok(Self::Mysql);
        }
        if driver.contains("postgres") || driver == "pq" || driver.contains("pgsql") {
            return Ok(Self::Postgres);
        }
        if driver.contains("sqlite") {
            return Ok(Self::Sqlite);
        }
        Err(ConfigError::Invalid(format!("unsupported dialect: {driver}")))
    }

    /// Returns the statement generator for this dialect.
    #[must_use]
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Mysql => Box::new(MysqlDialect),
            Self::Postgres => Box::new(PostgresDialect),
            Self::Sqlite => Box::new(SqliteDialect),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid(format!("unsupported dialect: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Dialect Trait
// ============================================================================

/// Backend-specific statement text rules.
pub trait Dialect: Send + Sync {
    /// Returns the dialect family.
    fn kind(&self) -> DialectKind;

    /// Quotes a table or column identifier.
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Column type used for timestamp columns.
    fn timestamp_type(&self) -> &'static str;

    /// Renders a string literal.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Renders a timestamp literal.
    fn timestamp_literal(&self, value: OffsetDateTime) -> String {
        self.string_literal(&format_datetime(value))
    }

    /// Renders the pagination clause, if any.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (None, Some(offset)) => Some(format!("OFFSET {offset}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
        }
    }
}

/// Quotes an identifier with `quote`, doubling embedded quote characters.
fn quote_with(identifier: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    format!("{quote}{}{quote}", identifier.replace(quote, &doubled))
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

/// `MySQL` statement rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '`')
    }

    fn timestamp_type(&self) -> &'static str {
        "datetime"
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (limit, Some(offset)) => {
                Some(format!("LIMIT {} OFFSET {offset}", limit.unwrap_or(u64::MAX)))
            }
        }
    }
}

/// `PostgreSQL` statement rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    fn timestamp_type(&self) -> &'static str {
        "timestamptz(6)"
    }

    fn timestamp_literal(&self, value: OffsetDateTime) -> String {
        self.string_literal(&format!("{}+00:00", format_datetime(value)))
    }
}

/// `SQLite` statement rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    fn timestamp_type(&self) -> &'static str {
        "datetime"
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {offset}")),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
