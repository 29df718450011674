//! Execution interface.
//!
//! Driver crates implement [`Connection`] to issue [`Statement`]s against a
//! live database. Connection pooling, acquisition and release are the
//! driver's concern; every call here is blocking and independently committed.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// A SQL statement with positional parameters.
///
/// Statements are assembled from static SQL fragments, quoted identifiers,
/// escaped literals and `$n` parameters. Runtime strings can only enter the
/// text through [`identifier`](Self::identifier) or
/// [`literal`](Self::literal), so a name is never spliced in as SQL and a
/// value is never read as a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    /// Creates an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a SQL fragment.
    #[must_use]
    pub fn sql(mut self, fragment: &'static str) -> Self {
        self.sql.push_str(fragment);
        self
    }

    /// Appends a double-quoted identifier.
    #[must_use]
    pub fn identifier(mut self, name: &str) -> Self {
        self.sql.push('"');
        self.sql.push_str(&name.replace('"', "\"\""));
        self.sql.push('"');
        self
    }

    /// Appends identifiers separated by `", "`.
    #[must_use]
    pub fn identifiers<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self = self.sql(", ");
            }
            self = self.identifier(name.as_ref());
        }
        self
    }

    /// Appends a single-quoted string literal.
    ///
    /// Backslashes switch to the `E'...'` form so the literal reads the same
    /// whatever `standard_conforming_strings` is set to.
    #[must_use]
    pub fn literal(mut self, text: &str) -> Self {
        let escaped = text.replace('\'', "''");
        if escaped.contains('\\') {
            self.sql.push_str("E'");
            self.sql.push_str(&escaped.replace('\\', "\\\\"));
        } else {
            self.sql.push('\'');
            self.sql.push_str(&escaped);
        }
        self.sql.push('\'');
        self
    }

    /// Appends a bound parameter placeholder (`$1`, `$2`, ...).
    #[must_use]
    pub fn param(mut self, value: Value) -> Self {
        self.params.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// The statement text.
    #[must_use]
    pub fn as_sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A result row keyed by field name. Values are text, `None` for NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: BTreeMap<String, Option<String>>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: &str, value: Option<&str>) -> Self {
        self.insert(name, value.map(str::to_string));
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.insert(name.into(), value);
    }

    /// Returns a nullable field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the row has no such field.
    pub fn optional(&self, name: &str) -> Result<Option<&str>> {
        self.fields
            .get(name)
            .map(Option::as_deref)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// Returns a non-null field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the field is absent or NULL.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.optional(name)?
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }
}

impl FromIterator<(String, Option<String>)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Blocking statement execution.
pub trait Connection {
    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the driver fails.
    fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Executes a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the driver fails.
    fn query_rows(&self, statement: &Statement) -> Result<Vec<Row>>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, statement: &Statement) -> Result<u64> {
        (**self).execute(statement)
    }

    fn query_rows(&self, statement: &Statement) -> Result<Vec<Row>> {
        (**self).query_rows(statement)
    }
}
