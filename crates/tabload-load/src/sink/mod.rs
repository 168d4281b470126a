use async_trait::async_trait;
use tabload_core::{TableSchema, TypedRow};

use crate::errors::LoadError;
use crate::statement::InsertStatement;

mod postgres;

pub use postgres::{PgSinkProvider, PgTableSink};

/// Destination of a table load, bound to a single connection.
#[async_trait]
pub trait TableSink: Send {
    /// Namespace the target tables live in.
    fn namespace(&self) -> &str;

    /// Remove every row of the target table.
    async fn truncate(&mut self, schema: &TableSchema) -> Result<(), LoadError>;

    /// Insert `rows` inside one transaction: commit on success, roll back on
    /// any failure.
    async fn write_batch(
        &mut self,
        statement: &InsertStatement,
        rows: &[TypedRow],
    ) -> Result<(), LoadError>;
}

/// Hands out one sink per table load.
#[async_trait]
pub trait SinkProvider: Send + Sync {
    type Sink: TableSink;

    async fn open(&self) -> Result<Self::Sink, LoadError>;
}
