use async_trait::async_trait;

use tabload_core::{Result, TableSchema};

/// Current state of a sequence backing a surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceInfo {
    /// Name as stored in the catalog.
    pub name: String,
    /// Last value handed out (or the value before the first one).
    pub current_value: i64,
}

/// Read access to a database's system catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Namespace the catalog reads tables and sequences from.
    fn namespace(&self) -> &str;

    /// Ordered column definitions for `table`.
    ///
    /// Fails with `SchemaNotFound` when the table is unknown or has no columns.
    async fn fetch_columns(&self, table: &str) -> Result<TableSchema>;

    /// Ordinary tables of the namespace, ordered by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// `max(column)` over `table`, or 0 when the table is empty.
    async fn max_value(&self, table: &str, column: &str) -> Result<i64>;

    /// Looks a sequence up by name, case-insensitively.
    async fn sequence(&self, name: &str) -> Result<Option<SequenceInfo>>;
}
