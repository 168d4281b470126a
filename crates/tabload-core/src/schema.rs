use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column type family resolved once from catalog metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectType {
    NumericFloat,
    NumericIntegerOrDecimal,
    Date,
    Text,
}

/// Column metadata for one table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub ordinal: i32,
    pub name: String,
    pub dialect_type: DialectType,
    /// Declared type as formatted by the catalog (e.g. `numeric(10,2)`).
    pub type_name: String,
    pub nullable: bool,
    pub length: Option<i32>,
    pub numeric_precision: Option<i32>,
    /// Only meaningful for [`DialectType::NumericIntegerOrDecimal`].
    pub numeric_scale: Option<i32>,
}

impl ColumnDefinition {
    /// True when values must parse as 64-bit integers (scale zero or absent).
    pub fn is_integral(&self) -> bool {
        self.dialect_type == DialectType::NumericIntegerOrDecimal
            && matches!(self.numeric_scale, None | Some(0))
    }
}

/// Ordered columns of a single table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnDefinition>,
    folded: HashMap<String, usize>,
}

impl TableSchema {
    /// Build a schema, ordering columns by catalog ordinal.
    ///
    /// An empty column list means the catalog does not know the table.
    pub fn new(table: impl Into<String>, mut columns: Vec<ColumnDefinition>) -> Result<Self> {
        let table = table.into();
        if columns.is_empty() {
            return Err(Error::SchemaNotFound(table));
        }

        columns.sort_by_key(|column| column.ordinal);

        let mut ordinals = BTreeSet::new();
        for column in &columns {
            if !ordinals.insert(column.ordinal) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate ordinal {} in table {table}",
                    column.ordinal
                )));
            }
        }

        let mut folded = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            folded.entry(column.name.to_lowercase()).or_insert(idx);
        }

        Ok(Self {
            table,
            columns,
            folded,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Case-insensitive column position; an exact match wins over a folded one.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .or_else(|| self.folded.get(&name.to_lowercase()).copied())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    /// First column in catalog order, the candidate surrogate key.
    pub fn key_column(&self) -> &ColumnDefinition {
        &self.columns[0]
    }
}
