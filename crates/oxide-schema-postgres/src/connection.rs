//! Blocking PostgreSQL connection.
//!
//! Wraps an `sqlx` pool and a current-thread Tokio runtime so the
//! synchronous [`Connection`] interface can drive it. Each call acquires a
//! pooled connection for one statement and returns it when done.

use oxide_schema::{Connection, Error as SchemaError, Row, Statement, Value};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, Postgres, Row as _};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::error::{PgError, Result};

/// Pool size used when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// A PostgreSQL pool usable from synchronous code.
///
/// Owns its runtime, so it must not be used from inside another Tokio
/// runtime.
#[derive(Debug)]
pub struct PgConnection {
    runtime: Runtime,
    pool: PgPool,
}

impl PgConnection {
    /// Connects to `url` with a pool of up to `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Runtime`] if the runtime cannot start and
    /// [`PgError::Database`] if the connection fails.
    pub fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PgError::Runtime)?;
        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url),
        )?;
        debug!(max_connections, "connected to PostgreSQL");
        Ok(Self { runtime, pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections.
    pub fn close(self) {
        self.runtime.block_on(self.pool.close());
    }
}

fn bind_all(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    statement
        .params()
        .iter()
        .fold(sqlx::query(statement.as_sql()), |query, value| match value {
            Value::Boolean(v) => query.bind(*v),
            Value::Timestamp(v) => query.bind(*v),
            Value::Numeric(v) => query.bind(*v),
            Value::Integer(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::UniqueId(v) => query.bind(*v),
        })
}

fn decode_row(row: &PgRow) -> oxide_schema::Result<Row> {
    row.columns()
        .iter()
        .map(|column| {
            let value: Option<String> = row
                .try_get(column.ordinal())
                .map_err(SchemaError::connection)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

impl Connection for PgConnection {
    fn execute(&self, statement: &Statement) -> oxide_schema::Result<u64> {
        debug!(sql = %statement, "execute");
        let result = self
            .runtime
            .block_on(bind_all(statement).execute(&self.pool))
            .map_err(SchemaError::connection)?;
        Ok(result.rows_affected())
    }

    fn query_rows(&self, statement: &Statement) -> oxide_schema::Result<Vec<Row>> {
        debug!(sql = %statement, "query");
        let rows = self
            .runtime
            .block_on(bind_all(statement).fetch_all(&self.pool))
            .map_err(SchemaError::connection)?;
        rows.iter().map(decode_row).collect()
    }
}
