//! Core contracts for tabload.
//!
//! This crate defines the column catalog model, raw and typed row types, and
//! the coercion rules that turn delimited text into dialect-typed values.

pub mod coerce;
pub mod error;
pub mod naming;
pub mod redaction;
pub mod schema;
pub mod value;

pub use coerce::{coerce, coerce_row};
pub use error::{Error, Result};
pub use naming::{
    DATA_TABLE_SUFFIX, is_key_column, qualified_name, quote_ident, quote_literal,
    table_name_from_path,
};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{ColumnDefinition, DialectType, TableSchema};
pub use value::{DATE_TIME_FORMAT, RawRow, TypedRow, TypedValue};
