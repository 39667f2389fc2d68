// crates/entity-store-core/src/config.rs
// ============================================================================
// Module: Entity Store Configuration
// Description: Table names, dialect override and runtime switches.
// Purpose: Load and validate store configuration from code or TOML.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`StoreConfig`] names the two live tables (and optionally the two trash
//! tables), optionally pins the SQL dialect, and toggles schema bootstrap and
//! statement logging. Configurations are validated before use: table names
//! must be non-empty, short, plain identifiers and pairwise distinct.
//!
//! Trash table names default to `<table>_trash` and are resolved into a
//! [`TableNames`] value once the configuration is validated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::dialect::DialectKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum table name length.
pub const MAX_TABLE_NAME_LENGTH: usize = 64;
/// Suffix appended to live table names to derive trash table names.
pub const TRASH_SUFFIX: &str = "_trash";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing failure.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration is well-formed but invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Store configuration.
///
/// # Invariants
/// - After [`StoreConfig::validate`] succeeds, [`StoreConfig::table_names`]
///   yields four distinct, plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Live entity table.
    pub entity_table: String,
    /// Live attribute table.
    pub attribute_table: String,
    /// Entity trash table; defaults to `<entity_table>_trash`.
    #[serde(default)]
    pub entity_trash_table: Option<String>,
    /// Attribute trash table; defaults to `<attribute_table>_trash`.
    #[serde(default)]
    pub attribute_trash_table: Option<String>,
    /// Dialect override; inferred from the backend driver when absent.
    #[serde(default)]
    pub dialect: Option<DialectKind>,
    /// Creates missing tables when the store is built.
    #[serde(default)]
    pub auto_migrate: bool,
    /// Emits a statement event for every statement executed.
    #[serde(default)]
    pub debug: bool,
}

impl StoreConfig {
    /// Creates a configuration for the given live tables.
    #[must_use]
    pub fn new(entity_table: impl Into<String>, attribute_table: impl Into<String>) -> Self {
        Self {
            entity_table: entity_table.into(),
            attribute_table: attribute_table.into(),
            entity_trash_table: None,
            attribute_trash_table: None,
            dialect: None,
            auto_migrate: false,
            debug: false,
        }
    }

    /// Overrides the entity trash table name.
    #[must_use]
    pub fn with_entity_trash_table(mut self, table: impl Into<String>) -> Self {
        self.entity_trash_table = Some(table.into());
        self
    }

    /// Overrides the attribute trash table name.
    #[must_use]
    pub fn with_attribute_trash_table(mut self, table: impl Into<String>) -> Self {
        self.attribute_trash_table = Some(table.into());
        self
    }

    /// Pins the SQL dialect.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Enables or disables schema bootstrap on construction.
    #[must_use]
    pub const fn with_auto_migrate(mut self, auto_migrate: bool) -> Self {
        self.auto_migrate = auto_migrate;
        self
    }

    /// Enables or disables statement logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, is too large,
    /// is not UTF-8, fails to parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Validates table names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a table name is empty, too long,
    /// contains characters other than ASCII alphanumerics and `_`, or
    /// collides with another table name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_table.is_empty() {
            return Err(ConfigError::Invalid("entity table name is required".to_string()));
        }
        if self.attribute_table.is_empty() {
            return Err(ConfigError::Invalid("attribute table name is required".to_string()));
        }
        let tables = self.table_names();
        let mut seen = BTreeSet::new();
        for (label, name) in [
            ("entity_table", tables.entities.as_str()),
            ("attribute_table", tables.attributes.as_str()),
            ("entity_trash_table", tables.entities_trash.as_str()),
            ("attribute_trash_table", tables.attributes_trash.as_str()),
        ] {
            validate_table_name(label, name)?;
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "{label} duplicates another table: {name}"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the four table names, applying trash defaults.
    #[must_use]
    pub fn table_names(&self) -> TableNames {
        TableNames {
            entities: self.entity_table.clone(),
            attributes: self.attribute_table.clone(),
            entities_trash: self
                .entity_trash_table
                .clone()
                .unwrap_or_else(|| format!("{}{TRASH_SUFFIX}", self.entity_table)),
            attributes_trash: self
                .attribute_trash_table
                .clone()
                .unwrap_or_else(|| format!("{}{TRASH_SUFFIX}", self.attribute_table)),
        }
    }
}

/// Validates a single table name.
fn validate_table_name(label: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(format!("{label} must not be empty")));
    }
    if name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{label} exceeds {MAX_TABLE_NAME_LENGTH} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Invalid(format!("{label} contains invalid characters: {name}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Table Names
// ============================================================================

/// Resolved table names used by every statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Live entity table.
    pub entities: String,
    /// Live attribute table.
    pub attributes: String,
    /// Entity trash table.
    pub entities_trash: String,
    /// Attribute trash table.
    pub attributes_trash: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use std::io::Write;

    use super::ConfigError;
    use super::StoreConfig;
    use crate::dialect::DialectKind;

    #[test]
    fn trash_tables_default_to_suffix() {
        let tables = StoreConfig::new("ents", "attrs").table_names();
        assert_eq!(tables.entities_trash, "ents_trash");
        assert_eq!(tables.attributes_trash, "attrs_trash");
    }

    #[test]
    fn explicit_trash_tables_override_defaults() {
        let tables = StoreConfig::new("ents", "attrs")
            .with_entity_trash_table("ents_bin")
            .with_attribute_trash_table("attrs_bin")
            .table_names();
        assert_eq!(tables.entities_trash, "ents_bin");
        assert_eq!(tables.attributes_trash, "attrs_bin");
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(matches!(StoreConfig::new("", "attrs").validate(), Err(ConfigError::Invalid(_))));
        assert!(matches!(StoreConfig::new("ents", "").validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unsafe_and_colliding_names_are_rejected() {
        assert!(StoreConfig::new("ents; drop", "attrs").validate().is_err());
        assert!(StoreConfig::new("same", "same").validate().is_err());
        assert!(StoreConfig::new("ents", "ents_trash").validate().is_err());
        assert!(StoreConfig::new("a".repeat(65), "attrs").validate().is_err());
        assert!(StoreConfig::new("ents", "attrs").validate().is_ok());
    }

    #[test]
    fn toml_config_parses_with_defaults() {
        let config = StoreConfig::from_toml_str(
            r#"
entity_table = "ents"
attribute_table = "attrs"
dialect = "postgres"
debug = true
"#,
        )
        .unwrap();
        assert_eq!(config.dialect, Some(DialectKind::Postgres));
        assert!(config.debug);
        assert!(!config.auto_migrate);
        assert_eq!(config.table_names().entities_trash, "ents_trash");
    }

    #[test]
    fn toml_config_rejects_unknown_fields() {
        let err = StoreConfig::from_toml_str(
            "entity_table = \"e\"\nattribute_table = \"a\"\nsurprise = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entity_table = \"e\"\nattribute_table = \"a\"\nauto_migrate = true")
            .unwrap();
        let config = StoreConfig::load(file.path()).unwrap();
        assert!(config.auto_migrate);

        let missing = file.path().with_extension("missing");
        assert!(matches!(StoreConfig::load(&missing), Err(ConfigError::Io(_))));
    }
}
