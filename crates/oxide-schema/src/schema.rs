//! Schema model.
//!
//! The same types describe both what a model requires and what the database
//! currently has, so the two can be compared field by field.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SemanticType;
use crate::value::ColumnDefault;

/// Primary key assumed for models that do not declare one.
pub const IMPLICIT_PRIMARY_KEY: &str = "id";

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Owning table.
    pub table: String,
    /// Column name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value.
    pub default: ColumnDefault,
}

impl ColumnDefinition {
    /// Creates a non-nullable column without a default.
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            ty,
            nullable: false,
            default: ColumnDefault::NoDefault,
        }
    }

    /// Marks the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets nullability explicitly.
    #[must_use]
    pub const fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the default.
    #[must_use]
    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = default;
        self
    }

    /// Checks that the default fits the column type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDefault`] for a literal of another type, a
    /// generator sentinel the type cannot use, a sequential default on a
    /// nullable column, or an unparsed expression.
    pub fn validate(&self) -> Result<()> {
        let reason = match &self.default {
            ColumnDefault::Literal(value) if value.semantic_type() != self.ty => format!(
                "{} literal on a {} column",
                value.semantic_type(),
                self.ty
            ),
            ColumnDefault::AutoSequential if self.ty != SemanticType::Integer => {
                format!("sequential default on a {} column", self.ty)
            }
            // SERIAL always implies NOT NULL.
            ColumnDefault::AutoSequential if self.nullable => {
                "sequential default on a nullable column".to_string()
            }
            ColumnDefault::AutoGeneratedId if self.ty != SemanticType::UniqueId => {
                format!("generated identifier default on a {} column", self.ty)
            }
            ColumnDefault::Unparsed(raw) => format!("unparsed expression '{raw}'"),
            _ => return Ok(()),
        };
        Err(Error::InvalidDefault {
            column: self.name.clone(),
            reason,
        })
    }
}

/// Definition of a table: ordered columns plus an ordered primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Columns keyed by name, in first-seen order.
    pub columns: IndexMap<String, ColumnDefinition>,
    /// Primary key columns in key order. Empty when none is declared.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Name of the live primary key constraint, for introspected tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_constraint: Option<String>,
}

impl TableDefinition {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_key: Vec::new(),
            primary_key_constraint: None,
        }
    }

    /// Inserts a column, replacing any column of the same name in place.
    pub fn add_column(&mut self, column: ColumnDefinition) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Builder form of [`add_column`](Self::add_column).
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.add_column(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    /// Looks up a column by name for mutation.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnDefinition> {
        self.columns.get_mut(name)
    }

    /// The key a model requires: the declared key, else `id` when the table
    /// has such a column, else none.
    #[must_use]
    pub fn defined_primary_key(&self) -> Vec<String> {
        if !self.primary_key.is_empty() {
            self.primary_key.clone()
        } else if self.columns.contains_key(IMPLICIT_PRIMARY_KEY) {
            vec![IMPLICIT_PRIMARY_KEY.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Name given to primary key constraints this crate creates.
    #[must_use]
    pub fn primary_key_constraint_name(&self) -> String {
        format!("{}_pkey", self.name)
    }

    /// Checks column defaults and the key the table will be given, declared
    /// or implicit.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::InvalidDefault`],
    /// [`Error::InvalidPrimaryKey`] or [`Error::NullablePrimaryKey`] found.
    pub fn validate(&self) -> Result<()> {
        for column in self.columns.values() {
            column.validate()?;
        }
        for key in self.defined_primary_key() {
            match self.columns.get(&key) {
                None => {
                    return Err(Error::InvalidPrimaryKey {
                        table: self.name.clone(),
                        column: key,
                    })
                }
                Some(column) if column.nullable => {
                    return Err(Error::NullablePrimaryKey {
                        table: self.name.clone(),
                        column: key,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Tables keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Tables, sorted by name for deterministic iteration.
    pub tables: BTreeMap<String, TableDefinition>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn add_table(&mut self, table: TableDefinition) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Looks up a table.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    /// Looks up a table for mutation.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableDefinition> {
        self.tables.get_mut(name)
    }

    /// Returns `true` if the table exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}
