use thiserror::Error;

/// Core error type shared across tabload crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The table does not exist in the catalog or exposes no columns.
    #[error("table not found in catalog: {0}")]
    SchemaNotFound(String),
    /// A text column has no counterpart in the table's catalog columns.
    #[error("column '{column}' does not exist in table {table}")]
    SchemaMismatch { table: String, column: String },
    /// A cell could not be converted into its column's declared type.
    #[error("cannot coerce column '{column}': {message}")]
    Coercion { column: String, message: String },
    /// The sequence backing a key column does not exist.
    #[error("sequence not found: {0}")]
    GeneratorNotFound(String),
    /// Catalog metadata violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
}

impl Error {
    pub(crate) fn coercion(column: &str, message: impl Into<String>) -> Self {
        Error::Coercion {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by tabload crates.
pub type Result<T> = std::result::Result<T, Error>;
