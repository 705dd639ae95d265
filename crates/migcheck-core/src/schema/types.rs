//! Core column type definitions.

use serde::{Deserialize, Serialize};

/// Column data types recognized by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Boolean value.
    Boolean,
    /// Signed integer. A `limit` of 8 bytes makes it bigint-wide.
    Integer {
        /// Storage width in bytes; 4 when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u8>,
    },
    /// 64-bit signed integer.
    #[serde(rename = "bigint")]
    BigInt,
    /// Floating point value.
    Float,
    /// Fixed-precision decimal.
    Decimal,
    /// Variable-length character string.
    String {
        /// Maximum length in characters, unbounded when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    /// Unbounded text.
    Text,
    /// Binary data.
    Binary,
    /// Calendar date.
    Date,
    /// Date and time.
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
    /// JSON document.
    Json,
}

impl ColumnType {
    /// Storage width in bytes for integer kinds, `None` otherwise.
    pub fn byte_width(&self) -> Option<u8> {
        match self {
            ColumnType::Integer { limit } => Some(limit.unwrap_or(4)),
            ColumnType::BigInt => Some(8),
            _ => None,
        }
    }

    /// Check if this type is an integer kind.
    pub fn is_integer(&self) -> bool {
        self.byte_width().is_some()
    }

    /// Check if a column of this type can hold every value of the given
    /// primary key type.
    ///
    /// Integer kinds compare by byte width (an explicit `limit: 8` integer
    /// holds every bigint key); every other kind must match structurally.
    pub fn matches_key(&self, key: &ColumnType) -> bool {
        match (self.byte_width(), key.byte_width()) {
            (Some(own), Some(referenced)) => own >= referenced,
            _ => self == key,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Integer { limit: None } => write!(f, "integer"),
            ColumnType::Integer { limit: Some(limit) } => write!(f, "integer(limit: {})", limit),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Decimal => write!(f, "decimal"),
            ColumnType::String { limit: None } => write!(f, "string"),
            ColumnType::String { limit: Some(limit) } => write!(f, "string(limit: {})", limit),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Binary => write!(f, "binary"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::Json => write!(f, "json"),
        }
    }
}

/// Default value attached to a new column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
    /// Floating point default.
    Float(f64),
    /// String default.
    String(String),
    /// Explicit NULL default.
    Null,
}
