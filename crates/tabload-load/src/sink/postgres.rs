use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Connection, PgPool, Postgres, Transaction};
use tracing::warn;

use tabload_core::{DialectType, TableSchema, TypedRow, TypedValue, qualified_name};

use super::{SinkProvider, TableSink};
use crate::errors::LoadError;
use crate::statement::InsertStatement;

/// Sink writing to PostgreSQL over one pooled connection.
pub struct PgTableSink {
    conn: PoolConnection<Postgres>,
    namespace: String,
}

impl std::fmt::Debug for PgTableSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTableSink")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PgTableSink {
    pub async fn acquire(pool: &PgPool, namespace: impl Into<String>) -> Result<Self, LoadError> {
        let conn = pool.acquire().await?;
        Ok(Self {
            conn,
            namespace: namespace.into(),
        })
    }
}

#[async_trait]
impl TableSink for PgTableSink {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn truncate(&mut self, schema: &TableSchema) -> Result<(), LoadError> {
        let sql = format!(
            "TRUNCATE TABLE {}",
            qualified_name(&self.namespace, schema.table())
        );
        sqlx::query(&sql)
            .execute(&mut *self.conn)
            .await
            .map_err(|err| LoadError::Execution(format!("truncating {}: {err}", schema.table())))?;
        Ok(())
    }

    async fn write_batch(
        &mut self,
        statement: &InsertStatement,
        rows: &[TypedRow],
    ) -> Result<(), LoadError> {
        let mut tx = Connection::begin(&mut *self.conn).await?;

        match insert_rows(&mut tx, statement, rows).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(
                        table = %statement.table(),
                        error = %rollback,
                        "rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    statement: &InsertStatement,
    rows: &[TypedRow],
) -> Result<(), LoadError> {
    for (offset, row) in rows.iter().enumerate() {
        let query = row
            .values()
            .iter()
            .fold(sqlx::query(statement.sql()), bind_value);
        query
            .execute(&mut **tx)
            .await
            .map_err(|err| LoadError::Execution(format!("row {} of batch: {err}", offset + 1)))?;
    }
    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q TypedValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        TypedValue::Null(DialectType::NumericFloat | DialectType::NumericIntegerOrDecimal) => {
            query.bind(None::<BigDecimal>)
        }
        TypedValue::Null(DialectType::Date) => query.bind(None::<NaiveDateTime>),
        TypedValue::Null(DialectType::Text) => query.bind(None::<String>),
        TypedValue::Integer(value) => query.bind(*value),
        TypedValue::Decimal(value) => query.bind(value),
        TypedValue::DateTime(value) => query.bind(*value),
        TypedValue::Text(value) => query.bind(value.as_str()),
    }
}

/// Opens a fresh pooled connection for each table.
#[derive(Debug, Clone)]
pub struct PgSinkProvider {
    pool: PgPool,
    namespace: String,
}

impl PgSinkProvider {
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl SinkProvider for PgSinkProvider {
    type Sink = PgTableSink;

    async fn open(&self) -> Result<PgTableSink, LoadError> {
        PgTableSink::acquire(&self.pool, self.namespace.clone()).await
    }
}
