//! Error types for the PostgreSQL driver and model files.

use std::path::PathBuf;

/// Errors raised outside the core reconciliation path.
#[derive(Debug, thiserror::Error)]
pub enum PgError {
    /// The driver failed to connect.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The blocking runtime could not be started.
    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),

    /// A model file could not be read.
    #[error("Failed to read model file '{path}': {source}")]
    ReadModels {
        /// Path to the model file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A model file is not valid JSON for the expected layout.
    #[error("Failed to parse model file '{path}': {source}")]
    ParseModels {
        /// Path to the model file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Schema derivation or reconciliation failed.
    #[error(transparent)]
    Schema(#[from] oxide_schema::Error),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, PgError>;
