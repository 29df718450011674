//! Catalog introspection.
//!
//! Reads `information_schema` through a [`Connection`] and builds the
//! [`SchemaSnapshot`] of what the database currently has.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::ddl::DdlGenerator;
use crate::error::Result;
use crate::schema::{ColumnDefinition, SchemaSnapshot, TableDefinition};
use crate::types::SemanticType;
use crate::value::decode_catalog_default;

/// Schema searched when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";

/// One row of `information_schema.columns`, undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Owning table.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
    /// Catalog type spelling, e.g. `character varying`.
    pub data_type: String,
    /// Whether the catalog reports the column as nullable.
    pub is_nullable: bool,
    /// Default expression, if any.
    pub column_default: Option<String>,
}

/// Reads the live schema of one database schema (namespace).
#[derive(Debug)]
pub struct Introspector<C> {
    conn: C,
    schema: String,
    generator: DdlGenerator,
}

impl<C: Connection> Introspector<C> {
    /// Creates an introspector for the `public` schema.
    #[must_use]
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            schema: DEFAULT_SCHEMA.to_string(),
            generator: DdlGenerator::new(),
        }
    }

    /// Targets another schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// The schema being read.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Lists base tables, excluding views.
    ///
    /// # Errors
    ///
    /// Propagates connection errors and malformed rows.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.conn
            .query_rows(&self.generator.list_tables(&self.schema))?
            .iter()
            .map(|row| row.require("table_name").map(str::to_string))
            .collect()
    }

    /// Lists every column of the schema in table and ordinal order.
    ///
    /// # Errors
    ///
    /// Propagates connection errors and malformed rows.
    pub fn list_columns(&self) -> Result<Vec<RawColumn>> {
        self.conn
            .query_rows(&self.generator.list_columns(&self.schema))?
            .iter()
            .map(|row| {
                Ok(RawColumn {
                    table_name: row.require("table_name")?.to_string(),
                    column_name: row.require("column_name")?.to_string(),
                    data_type: row.require("data_type")?.to_string(),
                    is_nullable: row.require("is_nullable")? == "YES",
                    column_default: row.optional("column_default")?.map(str::to_string),
                })
            })
            .collect()
    }

    /// Name of the table's primary key constraint, if it has one.
    ///
    /// # Errors
    ///
    /// Propagates connection errors and malformed rows.
    pub fn primary_key_constraint_name(&self, table: &str) -> Result<Option<String>> {
        let rows = self.conn.query_rows(
            &self
                .generator
                .primary_key_constraint_name(&self.schema, table),
        )?;
        rows.first()
            .map(|row| row.require("constraint_name").map(str::to_string))
            .transpose()
    }

    /// Columns of a primary key constraint in key order.
    ///
    /// # Errors
    ///
    /// Propagates connection errors and malformed rows.
    pub fn primary_key_columns(&self, table: &str, constraint: &str) -> Result<Vec<String>> {
        self.conn
            .query_rows(
                &self
                    .generator
                    .primary_key_columns(&self.schema, table, constraint),
            )?
            .iter()
            .map(|row| row.require("column_name").map(str::to_string))
            .collect()
    }

    /// Reads tables, columns and primary keys into a snapshot.
    ///
    /// Columns whose table is not in the table list are dropped: they belong
    /// to views, or to tables created after the table list was read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`](crate::Error::UnsupportedType) for
    /// a column whose catalog type has no mapping, and propagates connection
    /// errors.
    pub fn build_snapshot(&self) -> Result<SchemaSnapshot> {
        let tables = self.list_tables()?;
        let known: BTreeSet<&str> = tables.iter().map(String::as_str).collect();

        let mut snapshot = SchemaSnapshot::new();
        for table in &tables {
            snapshot.add_table(TableDefinition::new(table.as_str()));
        }

        for raw in self.list_columns()? {
            if !known.contains(raw.table_name.as_str()) {
                warn!(
                    table = %raw.table_name,
                    column = %raw.column_name,
                    "dropping column of unlisted table"
                );
                continue;
            }
            let column = decode_column(raw)?;
            if let Some(table) = snapshot.table_mut(&column.table) {
                table.add_column(column);
            }
        }

        for table in &tables {
            let Some(constraint) = self.primary_key_constraint_name(table)? else {
                continue;
            };
            let columns = self.primary_key_columns(table, &constraint)?;
            if let Some(def) = snapshot.table_mut(table) {
                def.primary_key = columns;
                def.primary_key_constraint = Some(constraint);
            }
        }

        debug!(
            schema = %self.schema,
            tables = snapshot.tables.len(),
            "introspected schema"
        );
        Ok(snapshot)
    }
}

fn decode_column(raw: RawColumn) -> Result<ColumnDefinition> {
    let ty = SemanticType::from_catalog_name(&raw.data_type, &raw.column_name)?;
    let default = decode_catalog_default(
        &raw.table_name,
        &raw.column_name,
        ty,
        raw.column_default.as_deref(),
    );
    Ok(ColumnDefinition::new(raw.table_name, raw.column_name, ty)
        .with_nullable(raw.is_nullable)
        .default(default))
}
