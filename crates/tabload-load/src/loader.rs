use std::time::Instant;

use tracing::{debug, error, info, warn};

use tabload_codec::CodecError;
use tabload_core::{RawRow, TableSchema, TypedRow, coerce_row};

use crate::batch::{Batch, batches};
use crate::errors::LoadError;
use crate::model::{BatchFailure, LoadOptions, LoadSummary};
use crate::sink::TableSink;
use crate::statement::InsertStatement;

/// Loads text rows into one table in independent, fixed-size transactions.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    options: LoadOptions,
}

impl BatchLoader {
    pub fn new(options: LoadOptions) -> Result<Self, LoadError> {
        if options.batch_size == 0 {
            return Err(LoadError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Replace the contents of `schema.table()` with `rows`.
    ///
    /// The table is truncated first. A failing batch is rolled back and
    /// recorded; later batches are still attempted and earlier ones stay
    /// committed. Only a failed truncate is returned as an error.
    pub async fn load<S, I>(
        &self,
        sink: &mut S,
        schema: &TableSchema,
        rows: I,
    ) -> Result<LoadSummary, LoadError>
    where
        S: TableSink + ?Sized,
        I: IntoIterator<Item = Result<RawRow, CodecError>>,
    {
        let table = schema.table();
        let statement = InsertStatement::new(sink.namespace(), schema);
        let mut summary = LoadSummary::new(table);
        let start = Instant::now();

        sink.truncate(schema).await?;
        info!(event = "table_truncated", table = %table);

        let mut pending = batches(rows, self.options.batch_size);
        loop {
            if self.options.abort_requested() {
                warn!(
                    event = "load_aborted",
                    table = %table,
                    batches_done = summary.batches_total,
                    "abort requested, remaining batches skipped"
                );
                summary.aborted = true;
                break;
            }

            let Some(batch) = pending.next() else {
                break;
            };

            summary.batches_total += 1;
            let (index, first_row, last_row) = (batch.index, batch.first_row, batch.last_row());

            let outcome = match prepare_batch(batch, schema) {
                Ok(typed) => sink
                    .write_batch(&statement, &typed)
                    .await
                    .map(|()| typed.len() as u64),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(count) => {
                    summary.rows_loaded += count;
                    debug!(
                        event = "batch_committed",
                        table = %table,
                        batch = index,
                        first_row,
                        last_row,
                        rows = count
                    );
                }
                Err(err) => {
                    summary.batches_failed += 1;
                    warn!(
                        event = "batch_failed",
                        table = %table,
                        batch = index,
                        first_row,
                        last_row,
                        error = %err,
                        "batch rolled back"
                    );
                    summary.failures.push(BatchFailure {
                        batch: index,
                        first_row,
                        last_row,
                        error: err.to_string(),
                    });

                    if err.is_fatal() {
                        error!(
                            event = "source_unreadable",
                            table = %table,
                            error = %err,
                            "stopping load"
                        );
                        summary.fatal_error = Some(err.to_string());
                        break;
                    }
                }
            }
        }

        info!(
            event = "table_loaded",
            table = %table,
            rows_loaded = summary.rows_loaded,
            batches = summary.batches_total,
            batches_failed = summary.batches_failed,
            duration_ms = start.elapsed().as_millis() as u64,
        );

        Ok(summary)
    }
}

/// Coerce every row of a batch before anything is executed for it.
///
/// Read errors surface here, so an unreadable record fails its batch. A
/// fatal read error takes precedence over row-level ones.
fn prepare_batch(
    batch: Batch<Result<RawRow, CodecError>>,
    schema: &TableSchema,
) -> Result<Vec<TypedRow>, LoadError> {
    let mut typed = Vec::with_capacity(batch.len());
    let mut first_error: Option<LoadError> = None;

    for item in batch.items {
        match item {
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                first_error.get_or_insert(err.into());
            }
            Ok(raw) if first_error.is_none() => match coerce_row(&raw, schema) {
                Ok(row) => typed.push(row),
                Err(err) => first_error = Some(err.into()),
            },
            Ok(_) => {}
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(typed),
    }
}
