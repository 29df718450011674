//! Type registry.
//!
//! Maps the closed set of [`SemanticType`]s to the Rust types models are
//! written with and to the spellings PostgreSQL uses for them, both in the
//! information schema and in DDL.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::value::Value;

/// The engine's classification of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// `true` / `false`.
    Boolean,
    /// Timestamp without time zone.
    Timestamp,
    /// Arbitrary precision decimal.
    Numeric,
    /// 32-bit signed integer.
    Integer,
    /// Variable length text.
    Text,
    /// UUID.
    UniqueId,
}

struct TypeEntry {
    semantic: SemanticType,
    rust_type: &'static str,
    catalog_name: &'static str,
    ddl_name: &'static str,
}

const REGISTRY: [TypeEntry; 6] = [
    TypeEntry {
        semantic: SemanticType::Boolean,
        rust_type: "bool",
        catalog_name: "boolean",
        ddl_name: "BOOLEAN",
    },
    TypeEntry {
        semantic: SemanticType::Timestamp,
        rust_type: "NaiveDateTime",
        catalog_name: "timestamp without time zone",
        ddl_name: "TIMESTAMP",
    },
    TypeEntry {
        semantic: SemanticType::Numeric,
        rust_type: "Decimal",
        catalog_name: "numeric",
        ddl_name: "NUMERIC",
    },
    TypeEntry {
        semantic: SemanticType::Integer,
        rust_type: "i32",
        catalog_name: "integer",
        ddl_name: "INTEGER",
    },
    TypeEntry {
        semantic: SemanticType::Text,
        rust_type: "String",
        catalog_name: "character varying",
        ddl_name: "VARCHAR",
    },
    TypeEntry {
        semantic: SemanticType::UniqueId,
        rust_type: "Uuid",
        catalog_name: "uuid",
        ddl_name: "UUID",
    },
];

impl SemanticType {
    /// All registered types, in registry order.
    pub const ALL: [Self; 6] = [
        Self::Boolean,
        Self::Timestamp,
        Self::Numeric,
        Self::Integer,
        Self::Text,
        Self::UniqueId,
    ];

    const fn entry(self) -> &'static TypeEntry {
        // REGISTRY is laid out in discriminant order.
        &REGISTRY[self as usize]
    }

    /// Resolves a Rust type spelling as written on a model field.
    ///
    /// Module paths are ignored, so `uuid::Uuid` and `Uuid` are equivalent.
    /// The caller strips any `Option<...>` wrapper first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when the type is not registered.
    pub fn from_rust_type(rust_type: &str, column: &str) -> Result<Self> {
        let trimmed = rust_type.trim();
        let base = trimmed.rsplit("::").next().unwrap_or(trimmed);
        REGISTRY
            .iter()
            .find(|e| e.rust_type == base)
            .map(|e| e.semantic)
            .ok_or_else(|| Error::UnsupportedType {
                type_name: rust_type.to_string(),
                column: column.to_string(),
            })
    }

    /// Resolves an `information_schema.columns.data_type` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when the type is not registered.
    pub fn from_catalog_name(data_type: &str, column: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|e| e.catalog_name.eq_ignore_ascii_case(data_type.trim()))
            .map(|e| e.semantic)
            .ok_or_else(|| Error::UnsupportedType {
                type_name: data_type.to_string(),
                column: column.to_string(),
            })
    }

    /// The Rust type a model uses for this column type.
    #[must_use]
    pub fn rust_type(self) -> &'static str {
        self.entry().rust_type
    }

    /// The spelling reported by `information_schema.columns.data_type`.
    #[must_use]
    pub fn catalog_name(self) -> &'static str {
        self.entry().catalog_name
    }

    /// The spelling used in `CREATE` / `ALTER` statements.
    #[must_use]
    pub fn ddl_name(self) -> &'static str {
        self.entry().ddl_name
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ddl_name())
    }
}

/// Rust types that can back a model column.
pub trait NativeType: Sized {
    /// The semantic type this Rust type maps to.
    const SEMANTIC_TYPE: SemanticType;

    /// Wraps the value.
    fn into_value(self) -> Value;
}

impl NativeType for bool {
    const SEMANTIC_TYPE: SemanticType = SemanticType::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl NativeType for NaiveDateTime {
    const SEMANTIC_TYPE: SemanticType = SemanticType::Timestamp;

    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }
}

impl NativeType for Decimal {
    const SEMANTIC_TYPE: SemanticType = SemanticType::Numeric;

    fn into_value(self) -> Value {
        Value::Numeric(self)
    }
}

impl NativeType for i32 {
    const SEMANTIC_TYPE: SemanticType = SemanticType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl NativeType for String {
    const SEMANTIC_TYPE: SemanticType = SemanticType::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl NativeType for Uuid {
    const SEMANTIC_TYPE: SemanticType = SemanticType::UniqueId;

    fn into_value(self) -> Value {
        Value::UniqueId(self)
    }
}
