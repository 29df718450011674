//! DDL generation for PostgreSQL.
//!
//! Each corrective [`Action`] renders to exactly one [`Statement`]. Names go
//! through [`Statement::identifier`] and values through
//! [`Statement::literal`] or bound parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::Statement;
use crate::schema::ColumnDefinition;
use crate::types::SemanticType;
use crate::value::{encode, sequence_name, ColumnDefault, Value};

/// Function used for database-generated UUID defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UuidGenerator {
    /// `uuidv7()`, time ordered (PostgreSQL 18 and later).
    #[default]
    UuidV7,
    /// `gen_random_uuid()`, random (PostgreSQL 13 and later).
    GenRandomUuid,
}

impl UuidGenerator {
    /// The SQL call expression.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::UuidV7 => "uuidv7()",
            Self::GenRandomUuid => "gen_random_uuid()",
        }
    }
}

/// A corrective schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a table with no columns.
    CreateTable {
        /// Table name.
        table: String,
    },
    /// Add a column.
    AddColumn(ColumnDefinition),
    /// Allow NULL in a column.
    DropNotNull {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Create the sequence backing a sequential default.
    CreateSequence {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Set a column default.
    SetDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// New default; never [`ColumnDefault::NoDefault`].
        default: ColumnDefault,
    },
    /// Remove a column default.
    DropDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Drop a named constraint.
    DropConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        constraint: String,
    },
    /// Create the primary key.
    CreatePrimaryKey {
        /// Table name.
        table: String,
        /// Key columns in order.
        columns: Vec<String>,
    },
}

impl Action {
    /// The table this action changes.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::AddColumn(column) => &column.table,
            Self::CreateTable { table }
            | Self::DropNotNull { table, .. }
            | Self::CreateSequence { table, .. }
            | Self::SetDefault { table, .. }
            | Self::DropDefault { table, .. }
            | Self::DropConstraint { table, .. }
            | Self::CreatePrimaryKey { table, .. } => table,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { table } => write!(f, "create table {table}"),
            Self::AddColumn(c) => write!(f, "add column {}.{}", c.table, c.name),
            Self::DropNotNull { table, column } => {
                write!(f, "drop not null on {table}.{column}")
            }
            Self::CreateSequence { table, column } => {
                write!(f, "create sequence for {table}.{column}")
            }
            Self::SetDefault { table, column, .. } => {
                write!(f, "set default on {table}.{column}")
            }
            Self::DropDefault { table, column } => write!(f, "drop default on {table}.{column}"),
            Self::DropConstraint { table, constraint } => {
                write!(f, "drop constraint {constraint} on {table}")
            }
            Self::CreatePrimaryKey { table, columns } => {
                write!(f, "create primary key on {table} ({})", columns.join(", "))
            }
        }
    }
}

/// Renders actions and catalog queries for PostgreSQL.
///
/// Without a schema, table and sequence names are left unqualified and
/// resolve through `search_path`.
#[derive(Debug, Clone, Default)]
pub struct DdlGenerator {
    uuid_generator: UuidGenerator,
    schema: Option<String>,
}

impl DdlGenerator {
    /// Creates a generator using `uuidv7()` for generated identifiers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            uuid_generator: UuidGenerator::UuidV7,
            schema: None,
        }
    }

    /// Selects the UUID generator function.
    #[must_use]
    pub fn with_uuid_generator(mut self, generator: UuidGenerator) -> Self {
        self.uuid_generator = generator;
        self
    }

    /// Qualifies every table and sequence with `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// The configured UUID generator.
    #[must_use]
    pub const fn uuid_generator(&self) -> UuidGenerator {
        self.uuid_generator
    }

    /// The schema names are qualified with, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Renders an action.
    #[must_use]
    pub fn render(&self, action: &Action) -> Statement {
        match action {
            Action::CreateTable { table } => self
                .qualified(Statement::new().sql("CREATE TABLE IF NOT EXISTS "), table)
                .sql(" ()"),
            Action::AddColumn(column) => self.add_column(column),
            Action::DropNotNull { table, column } => {
                self.alter_column(table, column).sql(" DROP NOT NULL")
            }
            Action::CreateSequence { table, column } => {
                let stmt = self.qualified(
                    Statement::new().sql("CREATE SEQUENCE IF NOT EXISTS "),
                    &sequence_name(table, column),
                );
                self.qualified(stmt.sql(" OWNED BY "), table)
                    .sql(".")
                    .identifier(column)
            }
            Action::SetDefault {
                table,
                column,
                default,
            } => {
                let stmt = self.alter_column(table, column).sql(" SET DEFAULT ");
                self.default_expr(stmt, table, column, default)
            }
            Action::DropDefault { table, column } => {
                self.alter_column(table, column).sql(" DROP DEFAULT")
            }
            Action::DropConstraint { table, constraint } => self
                .alter_table(table)
                .sql(" DROP CONSTRAINT ")
                .identifier(constraint),
            Action::CreatePrimaryKey { table, columns } => self
                .alter_table(table)
                .sql(" ADD CONSTRAINT ")
                .identifier(&format!("{table}_pkey"))
                .sql(" PRIMARY KEY (")
                .identifiers(columns)
                .sql(")"),
        }
    }

    fn add_column(&self, column: &ColumnDefinition) -> Statement {
        let serial =
            column.ty == SemanticType::Integer && column.default == ColumnDefault::AutoSequential;

        let mut stmt = self
            .alter_table(&column.table)
            .sql(" ADD COLUMN IF NOT EXISTS ")
            .identifier(&column.name)
            .sql(" ")
            .sql(if serial { "SERIAL" } else { column.ty.ddl_name() });

        if !column.nullable {
            stmt = stmt.sql(" NOT NULL");
        }

        if !serial && !column.default.is_none() {
            stmt = stmt.sql(" DEFAULT ");
            stmt = self.default_expr(stmt, &column.table, &column.name, &column.default);
        }
        stmt
    }

    fn default_expr(
        &self,
        stmt: Statement,
        table: &str,
        column: &str,
        default: &ColumnDefault,
    ) -> Statement {
        match default {
            ColumnDefault::Literal(value) => stmt.literal(&encode(value)),
            ColumnDefault::AutoGeneratedId => stmt.sql(self.uuid_generator.as_sql()),
            ColumnDefault::AutoSequential => {
                let sequence = quote_ident(&sequence_name(table, column));
                let regclass = match &self.schema {
                    Some(schema) => format!("{}.{sequence}", quote_ident(schema)),
                    None => sequence,
                };
                stmt.sql("nextval(").literal(&regclass).sql("::regclass)")
            }
            // Rejected by `ColumnDefinition::validate`.
            ColumnDefault::Unparsed(raw) => stmt.literal(raw),
            ColumnDefault::NoDefault => stmt.sql("NULL"),
        }
    }

    /// Appends `name`, prefixed with the schema when one is set.
    fn qualified(&self, stmt: Statement, name: &str) -> Statement {
        match &self.schema {
            Some(schema) => stmt.identifier(schema).sql(".").identifier(name),
            None => stmt.identifier(name),
        }
    }

    fn alter_table(&self, table: &str) -> Statement {
        self.qualified(Statement::new().sql("ALTER TABLE "), table)
    }

    fn alter_column(&self, table: &str, column: &str) -> Statement {
        self.alter_table(table)
            .sql(" ALTER COLUMN ")
            .identifier(column)
    }

    /// Lists base tables in `schema`.
    #[must_use]
    pub fn list_tables(&self, schema: &str) -> Statement {
        Statement::new()
            .sql(
                "SELECT table_name::text AS table_name \
                 FROM information_schema.tables \
                 WHERE table_schema = ",
            )
            .param(Value::Text(schema.to_string()))
            .sql(" AND table_type = 'BASE TABLE' ORDER BY table_name")
    }

    /// Lists columns of every table in `schema`.
    #[must_use]
    pub fn list_columns(&self, schema: &str) -> Statement {
        Statement::new()
            .sql(
                "SELECT table_name::text AS table_name, \
                 column_name::text AS column_name, \
                 data_type::text AS data_type, \
                 is_nullable::text AS is_nullable, \
                 column_default::text AS column_default \
                 FROM information_schema.columns \
                 WHERE table_schema = ",
            )
            .param(Value::Text(schema.to_string()))
            .sql(" ORDER BY table_name, ordinal_position")
    }

    /// Looks up the primary key constraint name of a table.
    #[must_use]
    pub fn primary_key_constraint_name(&self, schema: &str, table: &str) -> Statement {
        Statement::new()
            .sql(
                "SELECT constraint_name::text AS constraint_name \
                 FROM information_schema.table_constraints \
                 WHERE constraint_type = 'PRIMARY KEY' AND table_schema = ",
            )
            .param(Value::Text(schema.to_string()))
            .sql(" AND table_name = ")
            .param(Value::Text(table.to_string()))
    }

    /// Lists primary key columns in key order.
    #[must_use]
    pub fn primary_key_columns(&self, schema: &str, table: &str, constraint: &str) -> Statement {
        Statement::new()
            .sql(
                "SELECT column_name::text AS column_name \
                 FROM information_schema.key_column_usage \
                 WHERE constraint_schema = ",
            )
            .param(Value::Text(schema.to_string()))
            .sql(" AND table_name = ")
            .param(Value::Text(table.to_string()))
            .sql(" AND constraint_name = ")
            .param(Value::Text(constraint.to_string()))
            .sql(" ORDER BY ordinal_position")
    }

    /// Inserts one row with bound values.
    #[must_use]
    pub fn insert_row(&self, table: &str, values: &[(String, Value)]) -> Statement {
        let into = self.qualified(Statement::new().sql("INSERT INTO "), table);
        if values.is_empty() {
            return into.sql(" DEFAULT VALUES");
        }

        let columns: Vec<&str> = values.iter().map(|(name, _)| name.as_str()).collect();
        let mut stmt = into
            .sql(" (")
            .identifiers(&columns)
            .sql(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                stmt = stmt.sql(", ");
            }
            stmt = stmt.param(value.clone());
        }
        stmt.sql(")")
    }
}

/// Quotes a name the way [`Statement::identifier`] does, for use inside a
/// `regclass` literal.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
