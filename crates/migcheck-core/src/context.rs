//! Analysis context: target versions, per-migration overrides, and the
//! schema inspection boundary.
//!
//! The analyzer never talks to a live database. Everything it knows about
//! the target environment arrives through [`ContextProvider`] and
//! [`SchemaInspector`], injected at analysis start. Lookup failures are
//! non-fatal: rules gated on a missing piece of context are skipped with a
//! warning instead of aborting the analysis.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ColumnType;

/// Framework compatibility version migrations are pinned to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CompatVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl CompatVersion {
    /// Below this version the surrounding framework did not type-check
    /// foreign keys, so the mismatched-reference-type rule does not apply.
    pub const TYPED_REFERENCE_KEYS: CompatVersion = CompatVersion::new(5, 1);

    /// Build a version from its parts.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for CompatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Failed to parse a compatibility version string.
#[derive(Debug, Clone, Error)]
#[error("invalid compatibility version '{input}': expected MAJOR or MAJOR.MINOR")]
pub struct ParseVersionError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for CompatVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };
        Ok(CompatVersion::new(
            major.parse().map_err(|_| err())?,
            minor.parse().map_err(|_| err())?,
        ))
    }
}

/// Non-fatal failure to look up a piece of analysis context.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// The requested context is not available.
    #[error("{what} is unavailable: {reason}")]
    Unavailable {
        /// What was being looked up.
        what: String,
        /// Why the lookup failed.
        reason: String,
    },
}

impl ContextError {
    /// Convenience constructor for an unavailable lookup.
    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        ContextError::Unavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Per-migration override flags. Explicit caller-provided flags always take
/// precedence over inferred context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOverrides {
    /// Mark every recorded operation as escaped (whole-migration
    /// assume-safe).
    pub assume_safe: bool,
}

/// Read-only environment context supplied to the analyzer.
pub trait ContextProvider {
    /// Target database server major version.
    fn db_major_version(&self) -> Result<u32, ContextError>;

    /// Target framework compatibility version.
    fn compat_version(&self) -> Result<CompatVersion, ContextError>;

    /// Per-migration override flags.
    fn overrides(&self) -> MigrationOverrides {
        MigrationOverrides::default()
    }
}

/// Read-only view of the pre-existing schema, the external metadata
/// collaborator specified at its boundary.
pub trait SchemaInspector {
    /// Check if a table existed before this migration unit.
    fn table_exists(&self, table: &str) -> bool;

    /// Primary key type of a pre-existing table, when known.
    fn primary_key_type(&self, table: &str) -> Option<ColumnType>;
}

/// In-memory [`ContextProvider`] used by the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    db_major_version: Option<u32>,
    compat_version: Option<CompatVersion>,
    overrides: MigrationOverrides,
}

impl StaticContext {
    /// A context with nothing configured; every version lookup degrades.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the database server major version.
    pub fn with_db_major_version(mut self, version: u32) -> Self {
        self.db_major_version = Some(version);
        self
    }

    /// Configure the framework compatibility version.
    pub fn with_compat_version(mut self, version: CompatVersion) -> Self {
        self.compat_version = Some(version);
        self
    }

    /// Configure per-migration overrides.
    pub fn with_overrides(mut self, overrides: MigrationOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

impl ContextProvider for StaticContext {
    fn db_major_version(&self) -> Result<u32, ContextError> {
        self.db_major_version
            .ok_or_else(|| ContextError::unavailable("database major version", "not configured"))
    }

    fn compat_version(&self) -> Result<CompatVersion, ContextError> {
        self.compat_version
            .ok_or_else(|| ContextError::unavailable("compatibility version", "not configured"))
    }

    fn overrides(&self) -> MigrationOverrides {
        self.overrides
    }
}

/// In-memory [`SchemaInspector`] over a table-name to primary-key mapping.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<String, ColumnType>,
}

impl StaticSchema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-existing table with its primary key type.
    pub fn with_table(mut self, table: impl Into<String>, primary_key: ColumnType) -> Self {
        self.tables.insert(table.into(), primary_key);
        self
    }
}

impl SchemaInspector for StaticSchema {
    fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn primary_key_type(&self, table: &str) -> Option<ColumnType> {
        self.tables.get(table).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compat_version_ordering() {
        assert!(CompatVersion::new(5, 0) < CompatVersion::TYPED_REFERENCE_KEYS);
        assert!(CompatVersion::new(5, 1) >= CompatVersion::TYPED_REFERENCE_KEYS);
        assert!(CompatVersion::new(7, 0) > CompatVersion::new(5, 2));
    }

    #[test]
    fn test_compat_version_parse_and_display() {
        let version: CompatVersion = "7.1".parse().unwrap();
        assert_eq!(version, CompatVersion::new(7, 1));
        assert_eq!(version.to_string(), "7.1");

        let major_only: CompatVersion = "6".parse().unwrap();
        assert_eq!(major_only, CompatVersion::new(6, 0));

        assert!("seven.one".parse::<CompatVersion>().is_err());
    }

    #[test]
    fn test_static_context_degrades_gracefully() {
        let context = StaticContext::new();
        assert!(context.compat_version().is_err());
        assert!(context.db_major_version().is_err());

        let configured = StaticContext::new()
            .with_compat_version(CompatVersion::new(7, 1))
            .with_db_major_version(15);
        assert_eq!(configured.compat_version().unwrap(), CompatVersion::new(7, 1));
        assert_eq!(configured.db_major_version().unwrap(), 15);
    }

    #[test]
    fn test_static_schema_lookup() {
        let schema = StaticSchema::new().with_table("users", ColumnType::BigInt);
        assert!(schema.table_exists("users"));
        assert!(!schema.table_exists("ghosts"));
        assert_eq!(schema.primary_key_type("users"), Some(ColumnType::BigInt));
        assert_eq!(schema.primary_key_type("ghosts"), None);
    }
}
