use std::sync::Arc;

use chrono::NaiveDateTime;
use bigdecimal::BigDecimal;

use crate::schema::DialectType;

/// Textual form used for date-time values. Sub-second digits are appended
/// only when present.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One delimited-text row keyed by the file's header.
///
/// Header names are shared across all rows of a file. A value is `None` when
/// the record was shorter than the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    header: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl RawRow {
    pub fn new(header: Arc<[String]>, mut values: Vec<Option<String>>) -> Self {
        values.resize(header.len(), None);
        Self { header, values }
    }

    /// Build a standalone row from name/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Option<String>>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.map(Into::into)))
            .unzip();
        Self {
            header: names.into(),
            values,
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Case-insensitive lookup by column name.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.header
            .iter()
            .position(|key| key.eq_ignore_ascii_case(name))
            .map(|idx| self.values[idx].as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }
}

/// A value converted to the column's dialect family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// Typed null carrying the column family it binds as.
    Null(DialectType),
    Integer(i64),
    /// Arbitrary-precision decimal; scale is kept as parsed.
    Decimal(BigDecimal),
    DateTime(NaiveDateTime),
    Text(String),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null(_))
    }

    /// Render the value the way it is written to delimited text.
    pub fn render(&self) -> String {
        match self {
            TypedValue::Null(_) => String::new(),
            TypedValue::Integer(value) => value.to_string(),
            TypedValue::Decimal(value) => value.to_plain_string(),
            TypedValue::DateTime(value) => value.format(DATE_TIME_FORMAT).to_string(),
            TypedValue::Text(value) => value.clone(),
        }
    }
}

/// Typed values of one row, in schema column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedRow {
    values: Vec<TypedValue>,
}

impl TypedRow {
    pub fn new(values: Vec<TypedValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }
}
