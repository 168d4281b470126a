//! Loading delimited text into tables, exporting tables back out, and
//! repairing sequences after a bulk load.
//!
//! Imports are full replacements: the target table is truncated, then rows
//! are inserted in fixed-size batches, each in its own transaction.

pub mod batch;
pub mod errors;
pub mod export;
pub mod import;
pub mod loader;
pub mod model;
pub mod realign;
pub mod sink;
pub mod statement;

pub use batch::{Batch, Batches, batches};
pub use errors::LoadError;
pub use export::{PgExporter, select_statement};
pub use import::{DataFile, ImportRun, discover_files};
pub use loader::BatchLoader;
pub use model::{
    BatchFailure, ExportOptions, ExportReport, ExportTableReport, ImportOptions, ImportReport,
    LoadOptions, LoadSummary, TableReport, TableStatus,
};
pub use realign::{
    RealignOptions, RealignReport, SequenceRealigner, SequenceRepairEntry, SkippedTable,
    compute_drift, render_script, write_script,
};
pub use sink::{PgSinkProvider, PgTableSink, SinkProvider, TableSink};
pub use statement::InsertStatement;
