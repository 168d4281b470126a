use sqlx::PgPool;
use tracing::debug;

use tabload_core::{Error, Result, TableSchema};

use crate::adapter::{Catalog, SequenceInfo};
use crate::options::CatalogOptions;

mod mapper;
mod queries;

pub use mapper::dialect_type;

/// Catalog reader for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    options: CatalogOptions,
}

impl PostgresCatalog {
    /// Create a catalog reader using a pre-configured pool.
    pub fn new(pool: PgPool, options: CatalogOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Catalog for PostgresCatalog {
    fn namespace(&self) -> &str {
        &self.options.schema
    }

    async fn fetch_columns(&self, table: &str) -> Result<TableSchema> {
        let schema = &self.options.schema;
        let resolved = queries::resolve_table_name(&self.pool, schema, table)
            .await?
            .ok_or_else(|| Error::SchemaNotFound(format!("{schema}.{table}")))?;

        let raw = queries::list_columns(&self.pool, schema, &resolved).await?;
        debug!(table = %resolved, columns = raw.len(), "catalog columns fetched");
        TableSchema::new(resolved, mapper::map_columns(raw))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        queries::list_tables(&self.pool, &self.options.schema).await
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<i64> {
        queries::max_value(&self.pool, &self.options.schema, table, column).await
    }

    async fn sequence(&self, name: &str) -> Result<Option<SequenceInfo>> {
        let raw = queries::find_sequence(&self.pool, &self.options.schema, name).await?;
        Ok(raw.map(|seq| SequenceInfo {
            name: seq.name,
            current_value: seq.current_value,
        }))
    }
}
