//! Schema reconciliation.
//!
//! Compares the table a model requires against the live snapshot and either
//! applies corrective DDL or reports the first divergence it cannot repair.
//!
//! Checks run in a fixed order so the emitted DDL is reproducible:
//!
//! 1. The table must exist.
//! 2. Each expected column, in declaration order, must exist with the same
//!    type, nullability and default.
//! 3. The primary key must match position by position.
//!
//! Type changes and NOT NULL tightening are never applied, whatever
//! [`ReconcileOptions::auto_migrate`] says. Every applied action is executed
//! before the snapshot is updated, so an error part way through leaves the
//! snapshot describing exactly what reached the database.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::ddl::{Action, DdlGenerator};
use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, SchemaSnapshot, TableDefinition};
use crate::value::ColumnDefault;

/// Reconciliation behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Repair divergences instead of reporting them.
    #[serde(default)]
    pub auto_migrate: bool,
    /// Log statements without executing them. The snapshot is still updated,
    /// so the returned actions form a complete plan.
    #[serde(default)]
    pub dry_run: bool,
}

impl ReconcileOptions {
    /// Options that repair every repairable divergence.
    #[must_use]
    pub const fn migrate() -> Self {
        Self {
            auto_migrate: true,
            dry_run: false,
        }
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Applies expected table definitions to a live snapshot.
#[derive(Debug)]
pub struct Reconciler<C> {
    conn: C,
    generator: DdlGenerator,
    options: ReconcileOptions,
}

impl<C: Connection> Reconciler<C> {
    /// Creates a reconciler.
    #[must_use]
    pub const fn new(conn: C, generator: DdlGenerator, options: ReconcileOptions) -> Self {
        Self {
            conn,
            generator,
            options,
        }
    }

    /// The configured options.
    #[must_use]
    pub const fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Reconciles one table and returns the actions applied, in order.
    ///
    /// `model_name` only appears in errors.
    ///
    /// # Errors
    ///
    /// Returns the first divergence that cannot be repaired under the
    /// current options, or a connection error from executing an action.
    /// Actions applied before the error stay applied and recorded in
    /// `actual`.
    pub fn reconcile(
        &self,
        expected: &TableDefinition,
        model_name: &str,
        actual: &mut SchemaSnapshot,
    ) -> Result<Vec<Action>> {
        let mut applied = Vec::new();

        if !actual.contains(&expected.name) {
            if !self.options.auto_migrate {
                return Err(Error::TableNotFound {
                    table: expected.name.clone(),
                    model: model_name.to_string(),
                });
            }
            self.apply(
                Action::CreateTable {
                    table: expected.name.clone(),
                },
                &mut applied,
            )?;
            actual.add_table(TableDefinition::new(expected.name.as_str()));
        }

        let Some(table) = actual.table_mut(&expected.name) else {
            return Ok(applied);
        };

        for column in expected.columns.values() {
            self.reconcile_column(column, table, &mut applied)?;
        }

        self.reconcile_primary_key(expected, table, &mut applied)?;

        if applied.is_empty() {
            debug!(table = %expected.name, model = model_name, "schema up to date");
        }
        Ok(applied)
    }

    fn reconcile_column(
        &self,
        expected: &ColumnDefinition,
        table: &mut TableDefinition,
        applied: &mut Vec<Action>,
    ) -> Result<()> {
        let Some(current) = table.get_column(&expected.name).cloned() else {
            if !self.options.auto_migrate {
                return Err(Error::ColumnNotFound {
                    column: expected.name.clone(),
                    table: table.name.clone(),
                });
            }
            self.apply(Action::AddColumn(expected.clone()), applied)?;
            table.add_column(expected.clone());
            return Ok(());
        };

        if current.ty != expected.ty {
            return Err(Error::ColumnTypeMismatch {
                column: expected.name.clone(),
                actual: current.ty,
            });
        }

        if !current.nullable && expected.nullable {
            if !self.options.auto_migrate {
                return Err(Error::ColumnNotNullable {
                    column: expected.name.clone(),
                });
            }
            self.apply(
                Action::DropNotNull {
                    table: table.name.clone(),
                    column: expected.name.clone(),
                },
                applied,
            )?;
            if let Some(column) = table.get_column_mut(&expected.name) {
                column.nullable = true;
            }
        }

        if current.nullable && !expected.nullable {
            return Err(Error::ColumnNullable {
                column: expected.name.clone(),
            });
        }

        if current.default != expected.default {
            if !self.options.auto_migrate {
                return Err(Error::ColumnDefaultMismatch {
                    column: expected.name.clone(),
                });
            }
            for action in default_actions(&table.name, expected) {
                self.apply(action, applied)?;
            }
            if let Some(column) = table.get_column_mut(&expected.name) {
                column.default = expected.default.clone();
            }
        }

        Ok(())
    }

    fn reconcile_primary_key(
        &self,
        expected: &TableDefinition,
        table: &mut TableDefinition,
        applied: &mut Vec<Action>,
    ) -> Result<()> {
        let defined = expected.defined_primary_key();
        if defined.is_empty() || defined == table.primary_key {
            return Ok(());
        }
        if !self.options.auto_migrate {
            return Err(Error::PrimaryKeyMismatch {
                table: table.name.clone(),
                expected: defined,
                actual: table.primary_key.clone(),
            });
        }

        if !table.primary_key.is_empty() {
            let constraint = table
                .primary_key_constraint
                .clone()
                .unwrap_or_else(|| table.primary_key_constraint_name());
            self.apply(
                Action::DropConstraint {
                    table: table.name.clone(),
                    constraint,
                },
                applied,
            )?;
            table.primary_key.clear();
            table.primary_key_constraint = None;
        }

        self.apply(
            Action::CreatePrimaryKey {
                table: table.name.clone(),
                columns: defined.clone(),
            },
            applied,
        )?;
        table.primary_key_constraint = Some(table.primary_key_constraint_name());
        table.primary_key = defined;
        Ok(())
    }

    fn apply(&self, action: Action, applied: &mut Vec<Action>) -> Result<()> {
        let statement = self.generator.render(&action);
        info!(table = action.table(), dry_run = self.options.dry_run, "{action}");
        debug!(sql = %statement, "executing schema statement");
        if !self.options.dry_run {
            self.conn.execute(&statement)?;
        }
        applied.push(action);
        Ok(())
    }
}

/// Actions that move a column's default to `expected.default`.
fn default_actions(table: &str, expected: &ColumnDefinition) -> Vec<Action> {
    let table = table.to_string();
    let column = expected.name.clone();
    match &expected.default {
        ColumnDefault::NoDefault => vec![Action::DropDefault { table, column }],
        ColumnDefault::AutoSequential => vec![
            Action::CreateSequence {
                table: table.clone(),
                column: column.clone(),
            },
            Action::SetDefault {
                table,
                column,
                default: ColumnDefault::AutoSequential,
            },
        ],
        default => vec![Action::SetDefault {
            table,
            column,
            default: default.clone(),
        }],
    }
}
