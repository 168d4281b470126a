use std::path::Path;

/// Suffix some exporters append to data file names.
pub const DATA_TABLE_SUFFIX: &str = "_DATA_TABLE";

/// Derive the target table name from a data file path.
///
/// The extension is dropped, then a trailing [`DATA_TABLE_SUFFIX`].
pub fn table_name_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = stem.strip_suffix(DATA_TABLE_SUFFIX).unwrap_or(stem);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Schema-qualified, quoted relation name.
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// True when a column name carries the surrogate-key prefix (case-insensitive).
pub fn is_key_column(name: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && name.len() > prefix.len()
        && name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
