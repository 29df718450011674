#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use oxide_schema::{Connection, Error, Result, Row, Statement, Value};

/// Catalog contents served to introspection queries.
#[derive(Debug, Default)]
pub struct Catalog {
    pub tables: Vec<String>,
    pub columns: Vec<Row>,
    /// Table name to (constraint name, key columns).
    pub primary_keys: BTreeMap<String, (String, Vec<String>)>,
}

impl Catalog {
    pub fn table(mut self, name: &str) -> Self {
        self.tables.push(name.to_string());
        self
    }

    pub fn column(
        mut self,
        table: &str,
        name: &str,
        data_type: &str,
        nullable: bool,
        default: Option<&str>,
    ) -> Self {
        self.columns.push(
            Row::new()
                .with("table_name", Some(table))
                .with("column_name", Some(name))
                .with("data_type", Some(data_type))
                .with("is_nullable", Some(if nullable { "YES" } else { "NO" }))
                .with("column_default", default),
        );
        self
    }

    pub fn primary_key(mut self, table: &str, constraint: &str, columns: &[&str]) -> Self {
        self.primary_keys.insert(
            table.to_string(),
            (
                constraint.to_string(),
                columns.iter().map(ToString::to_string).collect(),
            ),
        );
        self
    }
}

/// In-memory connection that serves a fixed catalog and records every
/// executed statement.
///
/// The catalog lives in one schema (`public` unless set with
/// [`in_schema`](Self::in_schema)); catalog queries for any other schema
/// see no rows.
#[derive(Debug)]
pub struct RecordingConnection {
    catalog: Catalog,
    schema: String,
    executed: RefCell<Vec<Statement>>,
    fail_on: Option<&'static str>,
}

impl RecordingConnection {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            schema: "public".to_string(),
            executed: RefCell::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Places the catalog in `schema`.
    pub fn in_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn empty() -> Self {
        Self::new(Catalog::default())
    }

    /// Fails any executed statement containing `fragment`.
    pub fn failing_on(mut self, fragment: &'static str) -> Self {
        self.fail_on = Some(fragment);
        self
    }

    pub fn executed(&self) -> Vec<Statement> {
        self.executed.borrow().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .borrow()
            .iter()
            .map(|s| s.as_sql().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.executed.borrow_mut().clear();
    }
}

fn text_param(statement: &Statement, index: usize) -> &str {
    match statement.params().get(index) {
        Some(Value::Text(s)) => s,
        other => panic!("expected text parameter {index}, got {other:?}"),
    }
}

impl Connection for RecordingConnection {
    fn execute(&self, statement: &Statement) -> Result<u64> {
        if self
            .fail_on
            .is_some_and(|fragment| statement.as_sql().contains(fragment))
        {
            return Err(Error::connection(std::io::Error::other(format!(
                "refused: {statement}"
            ))));
        }
        self.executed.borrow_mut().push(statement.clone());
        Ok(1)
    }

    fn query_rows(&self, statement: &Statement) -> Result<Vec<Row>> {
        let sql = statement.as_sql();
        // Every catalog query binds the schema first.
        if text_param(statement, 0) != self.schema {
            return Ok(Vec::new());
        }
        if sql.contains("information_schema.tables") {
            return Ok(self
                .catalog
                .tables
                .iter()
                .map(|t| Row::new().with("table_name", Some(t.as_str())))
                .collect());
        }
        if sql.contains("information_schema.columns") {
            return Ok(self.catalog.columns.clone());
        }
        if sql.contains("information_schema.table_constraints") {
            let table = text_param(statement, 1);
            return Ok(self
                .catalog
                .primary_keys
                .get(table)
                .map(|(name, _)| vec![Row::new().with("constraint_name", Some(name.as_str()))])
                .unwrap_or_default());
        }
        if sql.contains("information_schema.key_column_usage") {
            let table = text_param(statement, 1);
            let constraint = text_param(statement, 2);
            return Ok(self
                .catalog
                .primary_keys
                .get(table)
                .filter(|(name, _)| name == constraint)
                .map(|(_, columns)| {
                    columns
                        .iter()
                        .map(|c| Row::new().with("column_name", Some(c.as_str())))
                        .collect()
                })
                .unwrap_or_default());
        }
        panic!("unexpected query: {sql}");
    }
}
