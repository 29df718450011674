//! Database facade.
//!
//! [`Database`] introspects once when opened, then reconciles each model as
//! it is registered against the same in-memory snapshot.

use tracing::info;

use crate::connection::Connection;
use crate::ddl::{Action, DdlGenerator};
use crate::error::{Error, Result};
use crate::introspect::{Introspector, DEFAULT_SCHEMA};
use crate::model::Model;
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::schema::{SchemaSnapshot, TableDefinition};
use crate::value::Value;

/// Settings for [`Database::open`].
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Schema (namespace) to introspect and reconcile.
    pub schema: String,
    /// Reconciliation options.
    pub options: ReconcileOptions,
    /// DDL rendering settings. [`Database::open`] qualifies its names with
    /// `schema`.
    pub generator: DdlGenerator,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            options: ReconcileOptions::default(),
            generator: DdlGenerator::new(),
        }
    }
}

impl DatabaseConfig {
    /// Default configuration with the given options.
    #[must_use]
    pub fn with_options(options: ReconcileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

/// A connection plus the live schema snapshot it has reconciled so far.
#[derive(Debug)]
pub struct Database<C> {
    conn: C,
    config: DatabaseConfig,
    generator: DdlGenerator,
    snapshot: SchemaSnapshot,
}

impl<C: Connection> Database<C> {
    /// Introspects the configured schema.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors.
    pub fn open(conn: C, config: DatabaseConfig) -> Result<Self> {
        let snapshot = Introspector::new(&conn)
            .with_schema(config.schema.as_str())
            .build_snapshot()?;
        info!(
            schema = %config.schema,
            tables = snapshot.tables.len(),
            auto_migrate = config.options.auto_migrate,
            "opened database"
        );
        let generator = config.generator.clone().with_schema(config.schema.as_str());
        Ok(Self {
            conn,
            config,
            generator,
            snapshot,
        })
    }

    /// Reconciles a model's table.
    ///
    /// # Errors
    ///
    /// Returns the model's definition errors or the first reconciliation
    /// error.
    pub fn register<M: Model>(&mut self) -> Result<Vec<Action>> {
        let table = M::table_definition()?;
        self.register_table(&table, M::MODEL_NAME)
    }

    /// Reconciles an explicit table definition.
    ///
    /// # Errors
    ///
    /// Returns validation errors or the first reconciliation error.
    pub fn register_table(
        &mut self,
        table: &TableDefinition,
        model_name: &str,
    ) -> Result<Vec<Action>> {
        table.validate()?;
        let reconciler = Reconciler::new(&self.conn, self.generator.clone(), self.config.options);
        let actions = reconciler.reconcile(table, model_name, &mut self.snapshot)?;
        info!(
            model = model_name,
            table = %table.name,
            actions = actions.len(),
            "registered model"
        );
        Ok(actions)
    }

    /// The live schema as reconciled so far.
    #[must_use]
    pub const fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// The generator used for every statement, qualified with the
    /// configured schema.
    #[must_use]
    pub const fn generator(&self) -> &DdlGenerator {
        &self.generator
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.conn
    }

    /// Inserts one row. `None` values are left out so database defaults
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTable`] or [`Error::ColumnNotFound`] for
    /// names missing from the snapshot, [`Error::InvalidValueType`] for a
    /// value of the wrong type, and propagates connection errors.
    pub fn insert(&self, table: &str, values: Vec<(String, Option<Value>)>) -> Result<u64> {
        let definition = self.snapshot.table(table).ok_or_else(|| Error::UnknownTable {
            table: table.to_string(),
        })?;

        let mut bound = Vec::with_capacity(values.len());
        for (column, value) in values {
            let Some(def) = definition.get_column(&column) else {
                return Err(Error::ColumnNotFound {
                    column,
                    table: table.to_string(),
                });
            };
            let Some(value) = value else {
                continue;
            };
            if value.semantic_type() != def.ty {
                return Err(Error::InvalidValueType {
                    column,
                    value: value.encode(),
                });
            }
            bound.push((column, value));
        }

        let statement = self.generator.insert_row(table, &bound);
        self.conn.execute(&statement)
    }
}
