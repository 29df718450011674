//! # oxide-schema-postgres
//!
//! PostgreSQL support for `oxide-schema`: a blocking [`PgConnection`] over an
//! `sqlx` pool, and the JSON [`ModelFile`] format read by the `oxide-schema`
//! command-line tool.

pub mod connection;
pub mod error;
pub mod models;

pub use connection::{PgConnection, DEFAULT_MAX_CONNECTIONS};
pub use error::{PgError, Result};
pub use models::{ColumnSpec, ModelFile, ModelSpec};
