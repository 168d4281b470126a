mod support;

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tabload_codec::resolve_encoding;
use tabload_core::{DialectType, TableSchema};
use tabload_load::{ImportOptions, ImportRun, LoadOptions, TableStatus, discover_files};

use support::{FakeCatalog, FakeProvider, POISON, column, emp_schema};

fn temp_folder() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tabload_import_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp folder");
    dir
}

fn dept_schema() -> TableSchema {
    TableSchema::new(
        "DEPT",
        vec![
            column(1, "DEPT_ID", DialectType::NumericIntegerOrDecimal, false),
            column(2, "NAME", DialectType::Text, true),
        ],
    )
    .unwrap()
}

fn options(folder: PathBuf, tables: Vec<String>) -> ImportOptions {
    ImportOptions {
        folder,
        encoding: resolve_encoding("utf-8").unwrap(),
        load: LoadOptions {
            batch_size: 2,
            abort: None,
        },
        tables,
    }
}

#[test]
fn discovers_csv_files_smallest_first() -> Result<()> {
    let dir = temp_folder();
    fs::write(dir.join("EMP.csv"), "SEQ_EMP,NAME\n1,A\n2,B\n3,C\n")?;
    fs::write(dir.join("DEPT_DATA_TABLE.CSV"), "DEPT_ID\n1\n")?;
    fs::write(dir.join("notes.txt"), "ignored")?;

    let files = discover_files(&dir)?;

    let tables: Vec<&str> = files.iter().map(|f| f.table.as_str()).collect();
    assert_eq!(tables, vec!["DEPT", "EMP"]);
    assert!(files[0].size < files[1].size);

    fs::remove_dir_all(dir).ok();
    Ok(())
}

#[tokio::test]
async fn imports_each_table_and_isolates_failures() -> Result<()> {
    let dir = temp_folder();
    fs::write(
        dir.join("EMP.csv"),
        format!("SEQ_EMP,NAME,HIRED\n1,A,2021-06-01 09:00:00\n2,B,\n3,{POISON},\n4,D,\n"),
    )?;
    fs::write(dir.join("DEPT_DATA_TABLE.csv"), "DEPT_ID,NAME\n10,Sales\n")?;
    fs::write(dir.join("GHOST.csv"), "ID\n1\n")?;

    let catalog = FakeCatalog::default()
        .with_table(emp_schema())
        .with_table(dept_schema());
    let provider = FakeProvider::default();

    let report = ImportRun::new(&catalog, &provider)
        .run(&options(dir.clone(), Vec::new()))
        .await?;

    let outcome: Vec<(&str, TableStatus)> = report
        .tables
        .iter()
        .map(|t| (t.table.as_str(), t.status))
        .collect();
    assert_eq!(
        outcome,
        vec![
            ("GHOST", TableStatus::Failed),
            ("DEPT", TableStatus::Loaded),
            ("EMP", TableStatus::Partial),
        ]
    );
    assert!(report.tables[0].error.as_deref().unwrap().contains("GHOST"));
    assert_eq!(report.rows_loaded(), 3);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.loaded_tables(), vec!["DEPT", "EMP"]);
    assert_eq!(
        provider.sink.events(),
        vec!["truncate:DEPT", "commit:1", "truncate:EMP", "commit:2", "rollback:2"]
    );

    fs::remove_dir_all(dir).ok();
    Ok(())
}

#[tokio::test]
async fn table_filter_skips_other_files() -> Result<()> {
    let dir = temp_folder();
    fs::write(dir.join("EMP.csv"), "SEQ_EMP,NAME\n1,A\n")?;
    fs::write(dir.join("DEPT.csv"), "DEPT_ID,NAME\n10,Sales\n")?;

    let catalog = FakeCatalog::default()
        .with_table(emp_schema())
        .with_table(dept_schema());
    let provider = FakeProvider::default();

    let report = ImportRun::new(&catalog, &provider)
        .run(&options(dir.clone(), vec!["emp".to_string()]))
        .await?;

    let dept = report.tables.iter().find(|t| t.table == "DEPT").unwrap();
    let emp = report.tables.iter().find(|t| t.table == "EMP").unwrap();
    assert_eq!(dept.status, TableStatus::Skipped);
    assert_eq!(emp.status, TableStatus::Loaded);
    assert_eq!(provider.sink.events(), vec!["truncate:EMP", "commit:1"]);

    fs::remove_dir_all(dir).ok();
    Ok(())
}

#[tokio::test]
async fn missing_folder_fails_the_run() {
    let catalog = FakeCatalog::default();
    let provider = FakeProvider::default();
    let missing = std::env::temp_dir().join(format!("tabload_missing_{}", uuid::Uuid::new_v4()));

    let result = ImportRun::new(&catalog, &provider)
        .run(&options(missing, Vec::new()))
        .await;

    assert!(result.is_err());
}
