//! Model descriptors.
//!
//! A model is a Rust struct whose fields become columns. The
//! `#[derive(Model)]` macro from `oxide-schema-derive` implements [`Model`]
//! with a static list of [`FieldSchema`]s; [`Model::table_definition`] turns
//! that list into the [`TableDefinition`] the reconciler expects.

use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, TableDefinition};
use crate::types::SemanticType;
use crate::value::{decode, ColumnDefault};

/// Default declared on a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// No default.
    None,
    /// Let the database generate the value.
    Auto,
    /// A literal, decoded with the field's type at registration.
    Literal(&'static str),
}

/// Static description of one model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    /// Column name.
    pub name: &'static str,
    /// Rust type as written, without the `Option<...>` wrapper.
    pub rust_type: &'static str,
    /// Whether the field is an `Option<...>`.
    pub nullable: bool,
    /// Declared default.
    pub default: FieldDefault,
}

impl FieldSchema {
    /// Resolves the field into a column of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for an unregistered Rust type and
    /// [`Error::InvalidDefault`] for a default the type cannot hold.
    pub fn to_column(self, table: &str) -> Result<ColumnDefinition> {
        let ty = SemanticType::from_rust_type(self.rust_type, self.name)?;
        let default = match self.default {
            FieldDefault::None => ColumnDefault::NoDefault,
            FieldDefault::Auto => {
                ColumnDefault::auto_for(ty).ok_or_else(|| Error::InvalidDefault {
                    column: self.name.to_string(),
                    reason: format!("{ty} columns have no generated default"),
                })?
            }
            FieldDefault::Literal(raw) => {
                let value = decode(ty, raw).map_err(|err| Error::InvalidDefault {
                    column: self.name.to_string(),
                    reason: err.to_string(),
                })?;
                ColumnDefault::Literal(value)
            }
        };
        Ok(ColumnDefinition::new(table, self.name, ty)
            .with_nullable(self.nullable)
            .default(default))
    }
}

/// A type whose fields map to a table.
pub trait Model {
    /// The Rust type name, used in error messages.
    const MODEL_NAME: &'static str;

    /// The SQL table name.
    const TABLE_NAME: &'static str;

    /// Fields in declaration order.
    const FIELDS: &'static [FieldSchema];

    /// Declared primary key columns; empty for the implicit `id` key.
    const PRIMARY_KEY: &'static [&'static str] = &[];

    /// Builds the table this model requires.
    ///
    /// # Errors
    ///
    /// Propagates field resolution and validation errors.
    fn table_definition() -> Result<TableDefinition> {
        let mut table = TableDefinition::new(Self::TABLE_NAME)
            .with_primary_key(Self::PRIMARY_KEY.iter().copied());
        for field in Self::FIELDS {
            table.add_column(field.to_column(Self::TABLE_NAME)?);
        }
        table.validate()?;
        Ok(table)
    }
}

/// Derives a table name from a type name.
///
/// `UserAccount` becomes `user_account`; acronym runs stay together, so
/// `HTTPRequestLog` becomes `http_request_log`.
#[must_use]
pub fn table_name_for(type_name: &str) -> String {
    let chars: Vec<char> = type_name.chars().collect();
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
