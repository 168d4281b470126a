use std::fs;
use std::path::{Path, PathBuf};

use bigdecimal::BigDecimal;
use chrono::{Local, NaiveDateTime};
use futures_util::TryStreamExt;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{error, info};

use tabload_codec::{TableWriter, WriteSummary};
use tabload_core::{
    ColumnDefinition, DialectType, TableSchema, TypedValue, qualified_name, quote_ident,
};
use tabload_introspect::{Catalog, PostgresCatalog};

use crate::errors::LoadError;
use crate::model::{ExportOptions, ExportReport, ExportTableReport};

/// Writes tables of a PostgreSQL namespace out as delimited text files.
#[derive(Debug, Clone)]
pub struct PgExporter {
    catalog: PostgresCatalog,
}

impl PgExporter {
    pub fn new(catalog: PostgresCatalog) -> Self {
        Self { catalog }
    }

    /// Export into a fresh `<folder>/<yyMMddHHmmss>` directory.
    pub async fn run(&self, options: &ExportOptions) -> Result<ExportReport, LoadError> {
        let directory = options
            .folder
            .join(Local::now().format("%y%m%d%H%M%S").to_string());
        fs::create_dir_all(&directory)?;

        let tables = if options.tables.is_empty() {
            self.catalog.list_tables().await?
        } else {
            options.tables.clone()
        };
        info!(
            event = "export_started",
            directory = %directory.display(),
            tables = tables.len(),
        );

        let mut report = ExportReport {
            directory: directory.clone(),
            tables: Vec::with_capacity(tables.len()),
        };

        for table in tables {
            let entry = match self.export_table(&table, &directory, options).await {
                Ok((file, written)) => {
                    info!(
                        event = "table_exported",
                        table = %table,
                        rows = written.rows,
                        bytes = written.bytes,
                    );
                    ExportTableReport {
                        table,
                        file: Some(file),
                        rows: written.rows,
                        bytes: written.bytes,
                        error: None,
                    }
                }
                Err(err) => {
                    error!(event = "table_export_failed", table = %table, error = %err);
                    ExportTableReport {
                        table,
                        file: None,
                        rows: 0,
                        bytes: 0,
                        error: Some(err.to_string()),
                    }
                }
            };
            report.tables.push(entry);
        }

        Ok(report)
    }

    async fn export_table(
        &self,
        table: &str,
        directory: &Path,
        options: &ExportOptions,
    ) -> Result<(PathBuf, WriteSummary), LoadError> {
        let schema = self.catalog.fetch_columns(table).await?;
        let path = directory.join(format!("{}.csv", schema.table()));

        let mut writer = TableWriter::create(&path, options.encoding)?;
        let header: Vec<String> = schema.columns().iter().map(|c| c.name.clone()).collect();
        writer.write_header(&header)?;

        let sql = select_statement(self.catalog.namespace(), &schema);
        let mut rows = sqlx::query(&sql).fetch(self.catalog.pool());
        while let Some(row) = rows.try_next().await? {
            let values = decode_row(&row, &schema)?;
            writer.write_row(&values)?;
        }

        let written = writer.finish()?;
        Ok((path, written))
    }
}

/// Select every column in schema order, cast to the type it is decoded as.
pub fn select_statement(namespace: &str, schema: &TableSchema) -> String {
    let columns = schema
        .columns()
        .iter()
        .map(|column| format!("{}::{}", quote_ident(&column.name), select_cast(column)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {columns} FROM {}",
        qualified_name(namespace, schema.table())
    )
}

fn select_cast(column: &ColumnDefinition) -> &'static str {
    match column.dialect_type {
        DialectType::NumericFloat => "numeric",
        DialectType::NumericIntegerOrDecimal if exports_as_integer(column) => "int8",
        DialectType::NumericIntegerOrDecimal => "numeric",
        DialectType::Date => "timestamp",
        DialectType::Text => "text",
    }
}

// An unconstrained numeric has no scale and may hold fractions.
fn exports_as_integer(column: &ColumnDefinition) -> bool {
    column.numeric_scale == Some(0)
}

fn decode_row(row: &PgRow, schema: &TableSchema) -> Result<Vec<TypedValue>, LoadError> {
    schema
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| decode_value(row, idx, column))
        .collect()
}

fn decode_value(
    row: &PgRow,
    idx: usize,
    column: &ColumnDefinition,
) -> Result<TypedValue, LoadError> {
    let decode_err =
        |err: sqlx::Error| LoadError::Execution(format!("decoding column {}: {err}", column.name));
    let null = TypedValue::Null(column.dialect_type);

    let value = match column.dialect_type {
        DialectType::NumericIntegerOrDecimal if exports_as_integer(column) => row
            .try_get::<Option<i64>, _>(idx)
            .map_err(decode_err)?
            .map_or(null, TypedValue::Integer),
        DialectType::NumericFloat | DialectType::NumericIntegerOrDecimal => row
            .try_get::<Option<BigDecimal>, _>(idx)
            .map_err(decode_err)?
            .map_or(null, TypedValue::Decimal),
        DialectType::Date => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map_err(decode_err)?
            .map_or(null, TypedValue::DateTime),
        DialectType::Text => row
            .try_get::<Option<String>, _>(idx)
            .map_err(decode_err)?
            .map_or(null, TypedValue::Text),
    };
    Ok(value)
}
