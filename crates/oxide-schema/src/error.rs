//! Error types for schema reconciliation.

use crate::types::SemanticType;

/// Errors raised while deriving, introspecting or reconciling a schema.
///
/// Every reconciliation error is fatal to the model being registered: the
/// caller is expected to fix either the database or the model and run again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Rust or database type has no registry mapping.
    #[error("unsupported type '{type_name}' for column '{column}'")]
    UnsupportedType {
        /// The offending type spelling.
        type_name: String,
        /// Column that declared it.
        column: String,
    },

    /// The model's table is missing and auto-migration is disabled.
    #[error("table '{table}' for model '{model}' does not exist on database")]
    TableNotFound {
        /// Table name.
        table: String,
        /// Model (type) name.
        model: String,
    },

    /// A model column is missing and auto-migration is disabled.
    #[error("column '{column}' does not exist in table '{table}'")]
    ColumnNotFound {
        /// Column name.
        column: String,
        /// Table name.
        table: String,
    },

    /// The database column has a different semantic type than the model.
    #[error("column '{column}' is type '{actual}' on database")]
    ColumnTypeMismatch {
        /// Column name.
        column: String,
        /// Semantic type found on the database.
        actual: SemanticType,
    },

    /// Relaxing a column to nullable requires auto-migration.
    #[error(
        "changing column '{column}' to nullable is not supported with auto-migration disabled"
    )]
    ColumnNotNullable {
        /// Column name.
        column: String,
    },

    /// Tightening a nullable column is never applied automatically.
    #[error("changing column '{column}' to not nullable is not supported")]
    ColumnNullable {
        /// Column name.
        column: String,
    },

    /// The declared default does not match the database.
    #[error("defined default value for column '{column}' does not match with the database")]
    ColumnDefaultMismatch {
        /// Column name.
        column: String,
    },

    /// The primary key differs and auto-migration is disabled.
    #[error("primary key of table '{table}' is ({}), expected ({})", .actual.join(", "), .expected.join(", "))]
    PrimaryKeyMismatch {
        /// Table name.
        table: String,
        /// Key columns declared by the model.
        expected: Vec<String>,
        /// Key columns found on the database.
        actual: Vec<String>,
    },

    /// A primary key names a column the table does not have.
    #[error("primary key column '{column}' is not defined on table '{table}'")]
    InvalidPrimaryKey {
        /// Table name.
        table: String,
        /// Missing column.
        column: String,
    },

    /// A primary key column is declared nullable. PostgreSQL forces key
    /// columns to NOT NULL, so such a model never matches the database.
    #[error("primary key column '{column}' of table '{table}' cannot be nullable")]
    NullablePrimaryKey {
        /// Table name.
        table: String,
        /// Nullable key column.
        column: String,
    },

    /// A declared default cannot be used for its column.
    #[error("invalid default for column '{column}': {reason}")]
    InvalidDefault {
        /// Column name.
        column: String,
        /// Why the default was rejected.
        reason: String,
    },

    /// A write names a table the snapshot does not have.
    #[error("cannot write to table '{table}': not in the schema snapshot")]
    UnknownTable {
        /// Table name.
        table: String,
    },

    /// A value does not match its column's semantic type at write time.
    #[error("invalid value '{value}' for column '{column}'")]
    InvalidValueType {
        /// Column name.
        column: String,
        /// Encoded form of the rejected value.
        value: String,
    },

    /// A literal could not be decoded as the requested type.
    #[error("cannot decode '{raw}' as {ty}")]
    Decode {
        /// Target semantic type.
        ty: SemanticType,
        /// The raw literal.
        raw: String,
    },

    /// A result row lacks a field the caller required.
    #[error("row has no field '{0}'")]
    MissingField(String),

    /// The execution collaborator failed.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a driver error.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Box::new(err))
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
