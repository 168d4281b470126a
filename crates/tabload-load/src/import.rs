use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use tabload_codec::open_for_read;
use tabload_core::table_name_from_path;
use tabload_introspect::Catalog;

use crate::errors::LoadError;
use crate::loader::BatchLoader;
use crate::model::{ImportOptions, ImportReport, LoadSummary, TableReport, TableStatus};
use crate::sink::SinkProvider;

/// A data file found in the import folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    pub table: String,
    pub size: u64,
}

/// List `*.csv` files of `folder`, smallest first, ties broken by name.
///
/// Files whose stem yields no table name are ignored.
pub fn discover_files(folder: &Path) -> Result<Vec<DataFile>, LoadError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let Some(table) = table_name_from_path(&path) else {
            warn!(file = %path.display(), "no table name in file name, skipped");
            continue;
        };

        files.push(DataFile {
            path,
            table,
            size: metadata.len(),
        });
    }

    files.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

/// Imports every data file of a folder, one table at a time.
pub struct ImportRun<'a, C: Catalog + ?Sized, P: SinkProvider> {
    catalog: &'a C,
    sinks: &'a P,
}

impl<'a, C: Catalog + ?Sized, P: SinkProvider> ImportRun<'a, C, P> {
    pub fn new(catalog: &'a C, sinks: &'a P) -> Self {
        Self { catalog, sinks }
    }

    /// Run the import. Table-level failures are recorded in the report; only
    /// invalid options or an unreadable folder fail the whole run.
    pub async fn run(&self, options: &ImportOptions) -> Result<ImportReport, LoadError> {
        let loader = BatchLoader::new(options.load.clone())?;
        let files = discover_files(&options.folder)?;
        info!(
            event = "import_started",
            folder = %options.folder.display(),
            files = files.len(),
            encoding = options.encoding.name(),
        );

        let mut report = ImportReport::default();
        for file in files {
            if !is_selected(&options.tables, &file.table) {
                report.tables.push(TableReport {
                    table: file.table,
                    file: file.path,
                    status: TableStatus::Skipped,
                    summary: None,
                    error: None,
                });
                continue;
            }

            if options.load.abort_requested() {
                warn!(event = "import_aborted", next_table = %file.table);
                report.aborted = true;
                break;
            }

            let table_report = self.import_file(&loader, options, file).await;
            let aborted = table_report
                .summary
                .as_ref()
                .is_some_and(|summary| summary.aborted);
            report.tables.push(table_report);
            if aborted {
                report.aborted = true;
                break;
            }
        }

        info!(
            event = "import_finished",
            tables = report.tables.len(),
            failed = report.failed_count(),
            rows_loaded = report.rows_loaded(),
            aborted = report.aborted,
        );
        Ok(report)
    }

    async fn import_file(
        &self,
        loader: &BatchLoader,
        options: &ImportOptions,
        file: DataFile,
    ) -> TableReport {
        info!(
            event = "table_started",
            table = %file.table,
            file = %file.path.display(),
            bytes = file.size,
        );

        match self.load_file(loader, options, &file).await {
            Ok(summary) => {
                let status = summary.status();
                if status == TableStatus::Failed {
                    error!(
                        event = "table_failed",
                        table = %file.table,
                        error = summary.fatal_error.as_deref().unwrap_or_default(),
                    );
                }
                TableReport {
                    table: file.table,
                    file: file.path,
                    status,
                    error: summary.fatal_error.clone(),
                    summary: Some(summary),
                }
            }
            Err(err) => {
                error!(event = "table_failed", table = %file.table, error = %err);
                TableReport {
                    table: file.table,
                    file: file.path,
                    status: TableStatus::Failed,
                    summary: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn load_file(
        &self,
        loader: &BatchLoader,
        options: &ImportOptions,
        file: &DataFile,
    ) -> Result<LoadSummary, LoadError> {
        let schema = self.catalog.fetch_columns(&file.table).await?;
        let reader = open_for_read(&file.path, options.encoding)?;
        let mut sink = self.sinks.open().await?;
        loader.load(&mut sink, &schema, reader).await
    }
}

fn is_selected(filter: &[String], table: &str) -> bool {
    filter.is_empty() || filter.iter().any(|name| name.eq_ignore_ascii_case(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_selects_everything() {
        assert!(is_selected(&[], "EMP"));
        assert!(is_selected(&["emp".to_string()], "EMP"));
        assert!(!is_selected(&["DEPT".to_string()], "EMP"));
    }
}
