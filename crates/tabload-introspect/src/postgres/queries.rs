use sqlx::PgPool;

use tabload_core::{Error, Result, qualified_name, quote_ident};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

/// Resolve a table name exactly first, then case-insensitively.
pub async fn resolve_table_name(pool: &PgPool, schema: &str, table: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r','p')
          and lower(c.relname) = lower($2)
        order by (c.relname = $2) desc, c.relname
        limit 1
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_optional(pool)
    .await
    .map_err(db_error)
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r','p')
          and not c.relispartition
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i32,
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attnum::int4 as ordinal_position,
          a.attname::text as name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          t.typname::text as udt_name,
          (not a.attnotnull) as is_nullable,
          ic.character_maximum_length::int4 as character_max_length,
          ic.numeric_precision::int4 as numeric_precision,
          ic.numeric_scale::int4 as numeric_scale
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        left join information_schema.columns ic
          on ic.table_schema = n.nspname and ic.table_name = c.relname and ic.column_name = a.attname
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
          and a.attgenerated = ''
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn max_value(pool: &PgPool, schema: &str, table: &str, column: &str) -> Result<i64> {
    let sql = format!(
        "select coalesce(max({}), 0)::int8 from {}",
        quote_ident(column),
        qualified_name(schema, table)
    );
    sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawSequence {
    pub name: String,
    pub current_value: i64,
}

pub async fn find_sequence(pool: &PgPool, schema: &str, name: &str) -> Result<Option<RawSequence>> {
    sqlx::query_as::<_, RawSequence>(
        r#"
        select
          s.sequencename::text as name,
          coalesce(s.last_value, s.start_value - s.increment_by)::int8 as current_value
        from pg_sequences s
        where s.schemaname = $1
          and lower(s.sequencename) = lower($2)
        order by (s.sequencename = $2) desc, s.sequencename
        limit 1
        "#,
    )
    .bind(schema)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(db_error)
}
