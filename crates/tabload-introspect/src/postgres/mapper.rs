use tabload_core::{ColumnDefinition, DialectType};

use super::queries::RawColumn;

/// Classify a PostgreSQL type name into its dialect family.
pub fn dialect_type(udt_name: &str) -> DialectType {
    match udt_name {
        "float4" | "float8" => DialectType::NumericFloat,
        "int2" | "int4" | "int8" | "numeric" | "oid" => DialectType::NumericIntegerOrDecimal,
        "date" | "timestamp" | "timestamptz" => DialectType::Date,
        _ => DialectType::Text,
    }
}

fn is_integer_type(udt_name: &str) -> bool {
    matches!(udt_name, "int2" | "int4" | "int8" | "oid")
}

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnDefinition> {
    raw.into_iter()
        .map(|col| {
            let dialect_type = dialect_type(&col.udt_name);
            let numeric_scale = if is_integer_type(&col.udt_name) {
                Some(0)
            } else if dialect_type == DialectType::NumericIntegerOrDecimal {
                col.numeric_scale
            } else {
                None
            };

            ColumnDefinition {
                ordinal: col.ordinal_position,
                name: col.name,
                dialect_type,
                type_name: col.data_type,
                nullable: col.is_nullable,
                length: col.character_max_length,
                numeric_precision: col.numeric_precision,
                numeric_scale,
            }
        })
        .collect()
}
