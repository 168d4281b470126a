//! Detection of drift between key sequences and the data they number.
//!
//! Corrections are emitted as a script for an operator to review and apply;
//! nothing here alters a sequence.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use tabload_core::{Error, is_key_column, qualified_name, quote_literal};
use tabload_introspect::Catalog;

/// Drift found for one table's key sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRepairEntry {
    pub table_name: String,
    pub generator_name: String,
    pub current_value: i64,
    pub max_data_value: i64,
    pub delta: i64,
}

#[derive(Debug, Clone)]
pub struct RealignOptions {
    /// Prefix marking a first column as a sequence-backed key.
    pub key_prefix: String,
}

impl Default for RealignOptions {
    fn default() -> Self {
        Self {
            key_prefix: "SEQ_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

/// Outcome of checking a set of tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RealignReport {
    pub entries: Vec<SequenceRepairEntry>,
    pub skipped: Vec<SkippedTable>,
}

/// Compare a sequence position with the largest key present.
///
/// Returns `None` when the sequence is already at or past the data.
pub fn compute_drift(
    table_name: &str,
    generator_name: &str,
    current_value: i64,
    max_data_value: i64,
) -> Option<SequenceRepairEntry> {
    if current_value >= max_data_value {
        return None;
    }

    Some(SequenceRepairEntry {
        table_name: table_name.to_string(),
        generator_name: generator_name.to_string(),
        current_value,
        max_data_value,
        delta: max_data_value.saturating_sub(current_value).saturating_add(1),
    })
}

/// Checks key sequences through a catalog.
pub struct SequenceRealigner<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    options: RealignOptions,
}

impl<'a, C: Catalog + ?Sized> SequenceRealigner<'a, C> {
    pub fn new(catalog: &'a C, options: RealignOptions) -> Self {
        Self { catalog, options }
    }

    /// Inspect one table.
    ///
    /// `Ok(None)` means the table has no prefixed key column or no drift.
    /// A missing sequence is reported as `Error::GeneratorNotFound`.
    pub async fn detect_drift(&self, table: &str) -> Result<Option<SequenceRepairEntry>, Error> {
        let schema = self.catalog.fetch_columns(table).await?;
        let key = schema.key_column();

        if !is_key_column(&key.name, &self.options.key_prefix) {
            debug!(table = %schema.table(), column = %key.name, "no sequence-backed key");
            return Ok(None);
        }

        let max_data_value = self.catalog.max_value(schema.table(), &key.name).await?;

        let sequence = self
            .catalog
            .sequence(&key.name)
            .await?
            .ok_or_else(|| Error::GeneratorNotFound(key.name.clone()))?;

        Ok(compute_drift(
            schema.table(),
            &sequence.name,
            sequence.current_value,
            max_data_value,
        ))
    }

    /// Inspect every table, logging and skipping the ones that cannot be checked.
    pub async fn realign_tables(&self, tables: &[String]) -> RealignReport {
        let mut report = RealignReport::default();

        for table in tables {
            match self.detect_drift(table).await {
                Ok(Some(entry)) => {
                    info!(
                        event = "sequence_drift",
                        table = %entry.table_name,
                        sequence = %entry.generator_name,
                        current = entry.current_value,
                        max = entry.max_data_value,
                        delta = entry.delta,
                    );
                    report.entries.push(entry);
                }
                Ok(None) => {}
                Err(err @ Error::GeneratorNotFound(_)) => {
                    warn!(event = "sequence_missing", table = %table, error = %err);
                    report.skipped.push(SkippedTable {
                        table: table.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(event = "realign_failed", table = %table, error = %err);
                    report.skipped.push(SkippedTable {
                        table: table.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        report
    }
}

/// Render the corrective statements: step by the delta, consume one value,
/// then restore an increment of 1.
pub fn render_script(namespace: &str, entries: &[SequenceRepairEntry]) -> String {
    let mut script = String::new();

    if entries.is_empty() {
        script.push_str("-- no sequence drift detected\n");
        return script;
    }

    for entry in entries {
        let sequence = qualified_name(namespace, &entry.generator_name);
        let _ = writeln!(
            script,
            "-- {}: sequence at {}, max key {}",
            entry.table_name, entry.current_value, entry.max_data_value
        );
        let _ = writeln!(script, "ALTER SEQUENCE {sequence} INCREMENT BY {};", entry.delta);
        let _ = writeln!(script, "SELECT nextval({});", quote_literal(&sequence));
        let _ = writeln!(script, "ALTER SEQUENCE {sequence} INCREMENT BY 1;");
        script.push('\n');
    }

    script
}

pub fn write_script(
    path: &Path,
    namespace: &str,
    entries: &[SequenceRepairEntry],
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_script(namespace, entries))
}
