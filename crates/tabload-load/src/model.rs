use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tabload_codec::Encoding;

/// Options for loading one table.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Rows per transaction; must be at least 1.
    pub batch_size: usize,
    /// When set, loading stops before the next batch starts.
    pub abort: Option<Arc<AtomicBool>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            abort: None,
        }
    }
}

impl LoadOptions {
    pub fn abort_requested(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// A batch that was rolled back.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch: usize,
    pub first_row: u64,
    pub last_row: u64,
    pub error: String,
}

/// Outcome of loading one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub rows_loaded: u64,
    pub batches_total: usize,
    pub batches_failed: usize,
    pub failures: Vec<BatchFailure>,
    /// Set when an abort request stopped the load between batches.
    pub aborted: bool,
    /// Set when the row source became unreadable mid-file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl LoadSummary {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows_loaded: 0,
            batches_total: 0,
            batches_failed: 0,
            failures: Vec::new(),
            aborted: false,
            fatal_error: None,
        }
    }

    pub fn status(&self) -> TableStatus {
        if self.fatal_error.is_some() {
            TableStatus::Failed
        } else if self.batches_failed > 0 || self.aborted {
            TableStatus::Partial
        } else {
            TableStatus::Loaded
        }
    }
}

/// Options for a folder import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub folder: PathBuf,
    pub encoding: &'static Encoding,
    pub load: LoadOptions,
    /// Restrict the run to these tables (case-insensitive); empty means all.
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Loaded,
    Partial,
    Failed,
    Skipped,
}

/// Per-table outcome of an import run.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub file: PathBuf,
    pub status: TableStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LoadSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub tables: Vec<TableReport>,
    pub aborted: bool,
}

impl ImportReport {
    pub fn rows_loaded(&self) -> u64 {
        self.tables
            .iter()
            .filter_map(|table| table.summary.as_ref())
            .map(|summary| summary.rows_loaded)
            .sum()
    }

    /// Tables that received at least one committed batch or were fully loaded.
    pub fn loaded_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|table| matches!(table.status, TableStatus::Loaded | TableStatus::Partial))
            .map(|table| {
                table
                    .summary
                    .as_ref()
                    .map(|summary| summary.table.clone())
                    .unwrap_or_else(|| table.table.clone())
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|table| table.status == TableStatus::Failed)
            .count()
    }
}

/// Options for an export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Parent folder; each run writes into a timestamped subdirectory.
    pub folder: PathBuf,
    pub encoding: &'static Encoding,
    /// Tables to export; empty means every table of the namespace.
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportTableReport {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub rows: u64,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for an export run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub directory: PathBuf,
    pub tables: Vec<ExportTableReport>,
}

impl ExportReport {
    pub fn failed_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|table| table.error.is_some())
            .count()
    }
}
