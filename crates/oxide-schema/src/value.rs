//! Value codec.
//!
//! Converts between typed [`Value`]s and the textual literals PostgreSQL
//! accepts and reports, and decodes the default expressions found in the
//! catalog into [`ColumnDefault`]s.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::SemanticType;

/// Format used to encode timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A typed column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),
    /// Decimal value.
    Numeric(Decimal),
    /// Integer value.
    Integer(i32),
    /// Text value.
    Text(String),
    /// UUID value.
    UniqueId(Uuid),
}

impl Value {
    /// Returns the semantic type of this value.
    #[must_use]
    pub const fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Boolean(_) => SemanticType::Boolean,
            Self::Timestamp(_) => SemanticType::Timestamp,
            Self::Numeric(_) => SemanticType::Numeric,
            Self::Integer(_) => SemanticType::Integer,
            Self::Text(_) => SemanticType::Text,
            Self::UniqueId(_) => SemanticType::UniqueId,
        }
    }

    /// Encodes the value as a database literal (unquoted).
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encodes a value as a database literal.
///
/// Text is returned as-is; quoting and escaping happen when the literal is
/// placed into a statement.
#[must_use]
pub fn encode(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        Value::Numeric(d) => d.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Text(s) => s.clone(),
        Value::UniqueId(u) => u.to_string(),
    }
}

/// Decodes a database literal as the given type.
///
/// # Errors
///
/// Returns [`Error::Decode`] when `raw` is not a valid literal of `ty`.
pub fn decode(ty: SemanticType, raw: &str) -> Result<Value> {
    let fail = || Error::Decode {
        ty,
        raw: raw.to_string(),
    };
    match ty {
        SemanticType::Boolean => {
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Boolean(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Boolean(false))
            } else {
                Err(fail())
            }
        }
        SemanticType::Timestamp => {
            let padded;
            let text = if raw.contains('.') {
                raw
            } else {
                padded = format!("{raw}.000000");
                &padded
            };
            NaiveDateTime::parse_from_str(text, TIMESTAMP_PARSE_FORMAT)
                .map(Value::Timestamp)
                .map_err(|_| fail())
        }
        SemanticType::Numeric => Decimal::from_str(raw)
            .map(Value::Numeric)
            .map_err(|_| fail()),
        SemanticType::Integer => raw
            .parse::<i32>()
            .map(Value::Integer)
            .map_err(|_| fail()),
        SemanticType::Text => Ok(Value::Text(raw.to_string())),
        SemanticType::UniqueId => Uuid::parse_str(raw)
            .map(Value::UniqueId)
            .map_err(|_| fail()),
    }
}

/// The default of a column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// No default.
    #[default]
    NoDefault,
    /// A concrete value of the column's type.
    Literal(Value),
    /// Database-generated sequential integer.
    AutoSequential,
    /// Database-generated unique identifier.
    AutoGeneratedId,
    /// A catalog default expression that could not be parsed.
    Unparsed(String),
}

impl ColumnDefault {
    /// Returns the generator sentinel matching `ty`, if the type has one.
    #[must_use]
    pub const fn auto_for(ty: SemanticType) -> Option<Self> {
        match ty {
            SemanticType::Integer => Some(Self::AutoSequential),
            SemanticType::UniqueId => Some(Self::AutoGeneratedId),
            _ => None,
        }
    }

    /// Returns `true` for the database-generated sentinels.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::AutoSequential | Self::AutoGeneratedId)
    }

    /// Returns `true` when no default is set.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::NoDefault)
    }
}

/// Outcome of a lenient decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The literal parsed as the requested type.
    Parsed(Value),
    /// The literal did not parse; the original text is kept.
    Raw(String),
}

/// Generator functions recognised as [`ColumnDefault::AutoGeneratedId`].
const UUID_GENERATORS: &[&str] = &["uuidv7()", "gen_random_uuid()"];

/// Decodes a catalog default expression without ever failing.
///
/// Cast suffixes (`'...'::character varying`), surrounding parentheses and
/// doubled quotes are removed before decoding. When the remaining literal
/// does not parse, the whole expression is returned as [`Decoded::Raw`].
#[must_use]
pub fn decode_lenient(ty: SemanticType, raw: &str) -> Decoded {
    let literal = strip_literal(raw);
    match decode(ty, &literal) {
        Ok(value) => Decoded::Parsed(value),
        Err(err) => {
            debug!(expression = %raw, error = %err, "keeping unparsed default");
            Decoded::Raw(raw.to_string())
        }
    }
}

/// Decodes `information_schema.columns.column_default` for a column.
#[must_use]
pub fn decode_catalog_default(
    table: &str,
    column: &str,
    ty: SemanticType,
    raw: Option<&str>,
) -> ColumnDefault {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return ColumnDefault::NoDefault;
    };

    match ty {
        SemanticType::Integer if is_owned_sequence(table, column, raw) => {
            return ColumnDefault::AutoSequential;
        }
        SemanticType::UniqueId if UUID_GENERATORS.contains(&raw) => {
            return ColumnDefault::AutoGeneratedId;
        }
        _ => {}
    }

    if is_null_literal(raw) {
        return ColumnDefault::NoDefault;
    }

    match decode_lenient(ty, raw) {
        Decoded::Parsed(value) => ColumnDefault::Literal(value),
        Decoded::Raw(raw) => ColumnDefault::Unparsed(raw),
    }
}

/// Name of the sequence PostgreSQL creates for a `SERIAL` column.
#[must_use]
pub fn sequence_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_seq")
}

fn is_owned_sequence(table: &str, column: &str, raw: &str) -> bool {
    let Some(arg) = raw
        .strip_prefix("nextval(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return false;
    };
    let arg = arg.strip_suffix("::regclass").unwrap_or(arg);
    let Some(name) = arg.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')) else {
        return false;
    };
    let name = name.rsplit('.').next().unwrap_or(name).replace('"', "");
    name == sequence_name(table, column)
}

fn is_null_literal(raw: &str) -> bool {
    let head = raw.split("::").next().unwrap_or(raw).trim();
    head.eq_ignore_ascii_case("null")
}

/// Reduces a catalog expression to the bare literal it carries.
fn strip_literal(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(body) = trimmed.strip_prefix('\'') {
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return out;
                }
            } else {
                out.push(c);
            }
        }
        // Unterminated quote.
        return trimmed.to_string();
    }

    let head = trimmed.split("::").next().unwrap_or(trimmed).trim();
    let mut inner = head;
    while let Some(stripped) = inner.strip_prefix('(').and_then(|i| i.strip_suffix(')')) {
        inner = stripped.trim();
    }
    inner.to_string()
}
