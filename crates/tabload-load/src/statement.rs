use tabload_core::{ColumnDefinition, DialectType, TableSchema, qualified_name, quote_ident};

/// Parameterized insert resolved once per table and reused for every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    sql: String,
    columns: usize,
}

impl InsertStatement {
    pub fn new(namespace: &str, schema: &TableSchema) -> Self {
        let columns = schema
            .columns()
            .iter()
            .map(|column| quote_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| placeholder(idx + 1, column))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            table: schema.table().to_string(),
            sql: format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                qualified_name(namespace, schema.table())
            ),
            columns: schema.len(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }
}

/// Text-family columns of non-string catalog types receive an explicit cast
/// so text reaches uuid, boolean, json and similar types.
fn placeholder(position: usize, column: &ColumnDefinition) -> String {
    if column.dialect_type == DialectType::Text && !is_string_type(&column.type_name) {
        format!("CAST(${position} AS {})", column.type_name)
    } else {
        format!("${position}")
    }
}

// Explicit casts to char(n)/varchar(n) truncate, so string types bind as-is.
fn is_string_type(type_name: &str) -> bool {
    type_name.is_empty() || type_name == "text" || type_name.starts_with("character")
}
