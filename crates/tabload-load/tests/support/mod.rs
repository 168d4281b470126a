#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tabload_core::{ColumnDefinition, DialectType, Error, TableSchema, TypedRow, TypedValue};
use tabload_introspect::{Catalog, SequenceInfo};
use tabload_load::{InsertStatement, LoadError, SinkProvider, TableSink};

pub fn column(ordinal: i32, name: &str, dialect_type: DialectType, nullable: bool) -> ColumnDefinition {
    ColumnDefinition {
        ordinal,
        name: name.to_string(),
        dialect_type,
        type_name: String::new(),
        nullable,
        length: None,
        numeric_precision: None,
        numeric_scale: match dialect_type {
            DialectType::NumericIntegerOrDecimal => Some(0),
            _ => None,
        },
    }
}

/// EMP(SEQ_EMP integer not null, NAME text, HIRED timestamp).
pub fn emp_schema() -> TableSchema {
    TableSchema::new(
        "EMP",
        vec![
            column(1, "SEQ_EMP", DialectType::NumericIntegerOrDecimal, false),
            column(2, "NAME", DialectType::Text, true),
            column(3, "HIRED", DialectType::Date, true),
        ],
    )
    .expect("valid schema")
}

/// Text value that makes the fake sink reject the batch holding it.
pub const POISON: &str = "BOOM";

#[derive(Debug, Default)]
pub struct SinkLog {
    /// `truncate:<table>`, `commit:<rows>` or `rollback:<rows>`, in call order.
    pub events: Vec<String>,
    pub committed: Vec<TypedRow>,
}

/// In-memory sink; a batch containing [`POISON`] is rolled back.
#[derive(Debug, Clone, Default)]
pub struct FakeSink {
    pub log: Arc<Mutex<SinkLog>>,
    /// Raised after every committed batch when set.
    pub abort_after_commit: Option<Arc<AtomicBool>>,
    pub fail_truncate: bool,
}

impl FakeSink {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().events.clone()
    }

    pub fn committed(&self) -> Vec<TypedRow> {
        self.log.lock().unwrap().committed.clone()
    }
}

#[async_trait]
impl TableSink for FakeSink {
    fn namespace(&self) -> &str {
        "public"
    }

    async fn truncate(&mut self, schema: &TableSchema) -> Result<(), LoadError> {
        if self.fail_truncate {
            return Err(LoadError::Execution("permission denied".to_string()));
        }
        self.log
            .lock()
            .unwrap()
            .events
            .push(format!("truncate:{}", schema.table()));
        Ok(())
    }

    async fn write_batch(
        &mut self,
        _statement: &InsertStatement,
        rows: &[TypedRow],
    ) -> Result<(), LoadError> {
        let poisoned = rows.iter().any(|row| {
            row.values()
                .iter()
                .any(|value| matches!(value, TypedValue::Text(text) if text == POISON))
        });

        let mut log = self.log.lock().unwrap();
        if poisoned {
            log.events.push(format!("rollback:{}", rows.len()));
            return Err(LoadError::Execution("value rejected".to_string()));
        }
        log.events.push(format!("commit:{}", rows.len()));
        log.committed.extend(rows.iter().cloned());
        drop(log);

        if let Some(flag) = &self.abort_after_commit {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Hands out sinks sharing one log.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    pub sink: FakeSink,
}

#[async_trait]
impl SinkProvider for FakeProvider {
    type Sink = FakeSink;

    async fn open(&self) -> Result<FakeSink, LoadError> {
        Ok(self.sink.clone())
    }
}

/// Catalog backed by maps; lookups are case-insensitive.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub tables: HashMap<String, TableSchema>,
    pub maxima: HashMap<String, i64>,
    pub sequences: HashMap<String, SequenceInfo>,
}

impl FakeCatalog {
    pub fn with_table(mut self, schema: TableSchema) -> Self {
        self.tables.insert(schema.table().to_lowercase(), schema);
        self
    }

    pub fn with_max(mut self, table: &str, max: i64) -> Self {
        self.maxima.insert(table.to_lowercase(), max);
        self
    }

    pub fn with_sequence(mut self, name: &str, current_value: i64) -> Self {
        self.sequences.insert(
            name.to_lowercase(),
            SequenceInfo {
                name: name.to_string(),
                current_value,
            },
        );
        self
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    fn namespace(&self) -> &str {
        "public"
    }

    async fn fetch_columns(&self, table: &str) -> tabload_core::Result<TableSchema> {
        self.tables
            .get(&table.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::SchemaNotFound(format!("public.{table}")))
    }

    async fn list_tables(&self) -> tabload_core::Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.values().map(|s| s.table().to_string()).collect();
        names.sort();
        Ok(names)
    }

    async fn max_value(&self, table: &str, _column: &str) -> tabload_core::Result<i64> {
        Ok(self.maxima.get(&table.to_lowercase()).copied().unwrap_or(0))
    }

    async fn sequence(&self, name: &str) -> tabload_core::Result<Option<SequenceInfo>> {
        Ok(self.sequences.get(&name.to_lowercase()).cloned())
    }
}
