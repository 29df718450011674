//! JSON model files for the command-line tool.
//!
//! A model file lists the tables to reconcile, in registration order:
//!
//! ```json
//! {
//!   "models": [
//!     {
//!       "name": "Order",
//!       "columns": [
//!         { "name": "id", "type": "unique_id", "auto": true },
//!         { "name": "total", "type": "numeric" },
//!         { "name": "note", "type": "text", "nullable": true }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The table name defaults to the snake_case model name, and the primary key
//! to `id` when such a column exists.

use std::path::Path;

use oxide_schema::{
    decode, table_name_for, ColumnDefault, ColumnDefinition, Error, SemanticType, TableDefinition,
};
use serde::{Deserialize, Serialize};

use crate::error::{PgError, Result};

/// Contents of a model file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFile {
    /// Models in registration order.
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

/// One model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, used in errors and to derive the table name.
    pub name: String,
    /// Explicit table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Ordered primary key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
}

/// One column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub nullable: bool,
    /// Database-generated value.
    #[serde(default)]
    pub auto: bool,
    /// Literal default, decoded with the column type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ModelFile {
    /// Reads and parses a model file.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::ReadModels`] or [`PgError::ParseModels`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PgError::ReadModels {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PgError::ParseModels {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ModelSpec {
    /// The table this model maps to.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| table_name_for(&self.name))
    }

    /// Builds and validates the table definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDefault`] or [`Error::InvalidPrimaryKey`].
    pub fn table_definition(&self) -> oxide_schema::Result<TableDefinition> {
        let name = self.table_name();
        let mut table =
            TableDefinition::new(name.as_str()).with_primary_key(self.primary_key.iter().cloned());
        for column in &self.columns {
            table.add_column(column.to_column(&name)?);
        }
        table.validate()?;
        Ok(table)
    }
}

impl ColumnSpec {
    fn to_column(&self, table: &str) -> oxide_schema::Result<ColumnDefinition> {
        let default = match (self.auto, &self.default) {
            (true, Some(_)) => {
                return Err(Error::InvalidDefault {
                    column: self.name.clone(),
                    reason: "both auto and a literal default".to_string(),
                });
            }
            (true, None) => {
                ColumnDefault::auto_for(self.ty).ok_or_else(|| Error::InvalidDefault {
                    column: self.name.clone(),
                    reason: format!("{} columns have no generated default", self.ty),
                })?
            }
            (false, Some(raw)) => ColumnDefault::Literal(decode(self.ty, raw).map_err(|err| {
                Error::InvalidDefault {
                    column: self.name.clone(),
                    reason: err.to_string(),
                }
            })?),
            (false, None) => ColumnDefault::NoDefault,
        };
        Ok(ColumnDefinition::new(table, self.name.as_str(), self.ty)
            .with_nullable(self.nullable)
            .default(default))
    }
}
