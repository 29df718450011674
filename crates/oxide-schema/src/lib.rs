//! # oxide-schema
//!
//! Model-driven schema reconciliation for PostgreSQL.
//!
//! Instead of hand-written migrations, each model describes the table it
//! needs. At startup the live catalog is introspected once, and every
//! registered model is compared against it:
//!
//! - missing tables and columns are created,
//! - nullability is relaxed and defaults are replaced,
//! - the primary key is dropped and recreated when it differs,
//!
//! provided auto-migration is enabled. Otherwise, and always for type
//! changes or NOT NULL tightening, reconciliation stops with a precise
//! [`Error`].
//!
//! ## Declaring a table
//!
//! ```rust
//! use oxide_schema::{
//!     Action, ColumnDefault, ColumnDefinition, DdlGenerator, SemanticType, TableDefinition,
//! };
//!
//! let order = TableDefinition::new("order")
//!     .column(
//!         ColumnDefinition::new("order", "id", SemanticType::UniqueId)
//!             .default(ColumnDefault::AutoGeneratedId),
//!     )
//!     .column(ColumnDefinition::new("order", "note", SemanticType::Text).nullable());
//!
//! let id = order.get_column("id").unwrap().clone();
//! let sql = DdlGenerator::new().render(&Action::AddColumn(id));
//! assert_eq!(
//!     sql.as_sql(),
//!     r#"ALTER TABLE "order" ADD COLUMN IF NOT EXISTS "id" UUID NOT NULL DEFAULT uuidv7()"#
//! );
//! ```
//!
//! Models usually come from `#[derive(Model)]` in `oxide-schema-derive` and
//! are registered through [`Database::register`]. Statements run through a
//! [`Connection`], implemented for PostgreSQL by `oxide-schema-postgres`.

pub mod connection;
pub mod database;
pub mod ddl;
pub mod error;
pub mod introspect;
pub mod model;
pub mod reconcile;
pub mod schema;
pub mod types;
pub mod value;

pub use connection::{Connection, Row, Statement};
pub use database::{Database, DatabaseConfig};
pub use ddl::{Action, DdlGenerator, UuidGenerator};
pub use error::{Error, Result};
pub use introspect::{Introspector, RawColumn, DEFAULT_SCHEMA};
pub use model::{table_name_for, FieldDefault, FieldSchema, Model};
pub use reconcile::{ReconcileOptions, Reconciler};
pub use schema::{ColumnDefinition, SchemaSnapshot, TableDefinition, IMPLICIT_PRIMARY_KEY};
pub use types::{NativeType, SemanticType};
pub use value::{decode, decode_catalog_default, decode_lenient, encode, ColumnDefault, Decoded, Value};
