use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tabload_core::{DialectType, Error};
use tabload_introspect::{Catalog, CatalogOptions, PostgresCatalog};

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

async fn setup(pool: &PgPool, schema: &str) -> Result<()> {
    let script = format!(
        r#"
        create schema "{schema}";
        create sequence "{schema}"."SEQ_EMP" start with 1;
        create table "{schema}"."EMP" (
          "SEQ_EMP" integer not null,
          "NAME" varchar(40),
          "SALARY" numeric(10,2),
          "RATIO" double precision,
          "HIRED" timestamp,
          "BADGE" numeric
        );
        insert into "{schema}"."EMP" ("SEQ_EMP", "NAME") values (7, 'A'), (12, 'B');
        select nextval('"{schema}"."SEQ_EMP"');
        select nextval('"{schema}"."SEQ_EMP"');
        "#
    );

    for statement in script.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing setup statement: {sql}"))?;
    }
    Ok(())
}

#[tokio::test]
async fn reads_columns_maxima_and_sequences() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL to run catalog tests");
        return Ok(());
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&url)
        .await
        .context("connecting to Postgres")?;

    let schema = format!("tabload_it_{}", uuid::Uuid::new_v4().simple());
    setup(&pool, &schema).await?;

    let catalog = PostgresCatalog::new(
        pool.clone(),
        CatalogOptions {
            schema: schema.clone(),
        },
    );

    let result = async {
        let columns = catalog.fetch_columns("emp").await?;
        assert_eq!(columns.table(), "EMP");
        let names: Vec<&str> = columns.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["SEQ_EMP", "NAME", "SALARY", "RATIO", "HIRED", "BADGE"]);

        let key = columns.key_column();
        assert!(!key.nullable);
        assert!(key.is_integral());

        let name = columns.column("name").ok_or_else(|| anyhow!("NAME missing"))?;
        assert_eq!(name.dialect_type, DialectType::Text);
        assert_eq!(name.length, Some(40));

        let salary = columns.column("SALARY").ok_or_else(|| anyhow!("SALARY missing"))?;
        assert_eq!(salary.numeric_scale, Some(2));
        assert!(!salary.is_integral());

        let ratio = columns.column("RATIO").ok_or_else(|| anyhow!("RATIO missing"))?;
        assert_eq!(ratio.dialect_type, DialectType::NumericFloat);

        let hired = columns.column("HIRED").ok_or_else(|| anyhow!("HIRED missing"))?;
        assert_eq!(hired.dialect_type, DialectType::Date);

        let badge = columns.column("BADGE").ok_or_else(|| anyhow!("BADGE missing"))?;
        assert!(badge.is_integral());

        assert_eq!(catalog.max_value("EMP", "SEQ_EMP").await?, 12);
        assert_eq!(catalog.list_tables().await?, vec!["EMP".to_string()]);

        let sequence = catalog
            .sequence("seq_emp")
            .await?
            .ok_or_else(|| anyhow!("sequence missing"))?;
        assert_eq!(sequence.name, "SEQ_EMP");
        assert_eq!(sequence.current_value, 2);
        assert!(catalog.sequence("SEQ_DEPT").await?.is_none());

        match catalog.fetch_columns("DEPT").await {
            Err(Error::SchemaNotFound(_)) => {}
            other => return Err(anyhow!("expected SchemaNotFound, got {other:?}")),
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    sqlx::query(&format!("drop schema \"{schema}\" cascade"))
        .execute(&pool)
        .await
        .context("dropping test schema")?;

    result
}
