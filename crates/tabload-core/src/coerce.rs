//! Conversion of delimited-text cells into dialect-typed values.
//!
//! Rules, in order:
//! 1. empty or absent text on a nullable column is a typed null;
//! 2. empty or absent text on a non-nullable column is an error;
//! 3. otherwise the column's [`DialectType`] picks the parser.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use bigdecimal::BigDecimal;

use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, DialectType, TableSchema};
use crate::value::{RawRow, TypedRow, TypedValue};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Convert one cell into a value of the column's dialect family.
pub fn coerce(raw: Option<&str>, column: &ColumnDefinition) -> Result<TypedValue> {
    let text = match raw {
        Some(text) if !text.is_empty() => text,
        _ if column.nullable => return Ok(TypedValue::Null(column.dialect_type)),
        _ => {
            return Err(Error::coercion(
                &column.name,
                "missing value for non-nullable column",
            ));
        }
    };

    match column.dialect_type {
        DialectType::NumericFloat => parse_decimal(text, column).map(TypedValue::Decimal),
        DialectType::NumericIntegerOrDecimal if column.is_integral() => {
            parse_integer(text, column).map(TypedValue::Integer)
        }
        DialectType::NumericIntegerOrDecimal => {
            parse_decimal(text, column).map(TypedValue::Decimal)
        }
        DialectType::Date => parse_date_time(text, column).map(TypedValue::DateTime),
        DialectType::Text => Ok(TypedValue::Text(text.to_string())),
    }
}

/// Convert a raw row into typed values ordered like `schema`.
///
/// Every key of `raw` must name a schema column. Schema columns the row does
/// not mention are coerced as absent.
pub fn coerce_row(raw: &RawRow, schema: &TableSchema) -> Result<TypedRow> {
    let mut cells: Vec<Option<&str>> = vec![None; schema.len()];

    for (name, value) in raw.iter() {
        let idx = schema
            .position(name)
            .ok_or_else(|| Error::SchemaMismatch {
                table: schema.table().to_string(),
                column: name.to_string(),
            })?;
        cells[idx] = value;
    }

    let values = schema
        .columns()
        .iter()
        .zip(cells)
        .map(|(column, cell)| coerce(cell, column))
        .collect::<Result<Vec<_>>>()?;

    Ok(TypedRow::new(values))
}

fn parse_decimal(text: &str, column: &ColumnDefinition) -> Result<BigDecimal> {
    BigDecimal::from_str(text.trim())
        .map_err(|_| Error::coercion(&column.name, format!("'{text}' is not a decimal number")))
}

fn parse_integer(text: &str, column: &ColumnDefinition) -> Result<i64> {
    let trimmed = text.trim();
    trimmed.parse::<i64>().map_err(|_| {
        if trimmed.contains('.') {
            Error::coercion(
                &column.name,
                format!("'{text}' has a fractional part but the column has scale 0"),
            )
        } else {
            Error::coercion(&column.name, format!("'{text}' is not a 64-bit integer"))
        }
    })
}

fn parse_date_time(text: &str, column: &ColumnDefinition) -> Result<NaiveDateTime> {
    let trimmed = text.trim();

    for format in DATE_TIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(value);
        }
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(value.naive_utc());
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(value) = date.and_hms_opt(0, 0, 0) {
                return Ok(value);
            }
        }
    }

    Err(Error::coercion(
        &column.name,
        format!("'{text}' is not a recognised date-time"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, dialect_type: DialectType, nullable: bool) -> ColumnDefinition {
        ColumnDefinition {
            ordinal: 1,
            name: name.to_string(),
            dialect_type,
            type_name: String::new(),
            nullable,
            length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    fn with_scale(mut column: ColumnDefinition, scale: Option<i32>) -> ColumnDefinition {
        column.numeric_scale = scale;
        column
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn empty_on_nullable_is_typed_null() {
        for dialect in [
            DialectType::NumericFloat,
            DialectType::NumericIntegerOrDecimal,
            DialectType::Date,
            DialectType::Text,
        ] {
            let col = column("C", dialect, true);
            assert_eq!(coerce(Some(""), &col).unwrap(), TypedValue::Null(dialect));
            assert_eq!(coerce(None, &col).unwrap(), TypedValue::Null(dialect));
        }
    }

    #[test]
    fn empty_on_required_column_fails() {
        for dialect in [
            DialectType::NumericFloat,
            DialectType::NumericIntegerOrDecimal,
            DialectType::Date,
            DialectType::Text,
        ] {
            let col = column("C", dialect, false);
            assert!(matches!(coerce(Some(""), &col), Err(Error::Coercion { .. })));
            assert!(matches!(coerce(None, &col), Err(Error::Coercion { .. })));
        }
    }

    #[test]
    fn scale_zero_parses_integers_only() {
        for scale in [None, Some(0)] {
            let col = with_scale(
                column("SEQ_EMP", DialectType::NumericIntegerOrDecimal, false),
                scale,
            );
            assert_eq!(coerce(Some("42"), &col).unwrap(), TypedValue::Integer(42));
            assert_eq!(coerce(Some(" -7 "), &col).unwrap(), TypedValue::Integer(-7));

            for bad in ["1.0", "1.5", ".5", "3."] {
                let err = coerce(Some(bad), &col).unwrap_err();
                match err {
                    Error::Coercion { column, message } => {
                        assert_eq!(column, "SEQ_EMP");
                        assert!(message.contains("fractional"), "{message}");
                    }
                    other => panic!("unexpected error {other:?}"),
                }
            }
            assert!(coerce(Some("abc"), &col).is_err());
            assert!(coerce(Some("99999999999999999999"), &col).is_err());
        }
    }

    #[test]
    fn scaled_numeric_parses_decimal() {
        let col = with_scale(
            column("AMOUNT", DialectType::NumericIntegerOrDecimal, true),
            Some(2),
        );
        assert_eq!(
            coerce(Some("12.50"), &col).unwrap(),
            TypedValue::Decimal(BigDecimal::from_str("12.50").unwrap())
        );
        assert_eq!(
            coerce(Some("3"), &col).unwrap(),
            TypedValue::Decimal(BigDecimal::from(3))
        );
    }

    #[test]
    fn float_accepts_scientific_notation() {
        let col = column("RATIO", DialectType::NumericFloat, true);
        assert_eq!(
            coerce(Some("1.5e3"), &col).unwrap(),
            TypedValue::Decimal(BigDecimal::from(1500))
        );
        assert_eq!(
            coerce(Some("0.25"), &col).unwrap(),
            TypedValue::Decimal(BigDecimal::from_str("0.25").unwrap())
        );
        assert!(coerce(Some("n/a"), &col).is_err());
    }

    #[test]
    fn decimals_beyond_96_bits_are_kept_exactly() {
        let float = column("RATIO", DialectType::NumericFloat, true);
        let wide = with_scale(
            column("AMOUNT", DialectType::NumericIntegerOrDecimal, true),
            Some(2),
        );
        let fine = with_scale(
            column("PRECISE", DialectType::NumericIntegerOrDecimal, true),
            Some(30),
        );

        for (col, text) in [
            (&float, "1e30"),
            (&float, "1.7976931348623157e308"),
            (&float, "1e-40"),
            (&wide, "123456789012345678901234567890.50"),
            (&fine, "0.123456789012345678901234567891"),
        ] {
            let value = coerce(Some(text), col).unwrap();
            assert_eq!(
                value,
                TypedValue::Decimal(BigDecimal::from_str(text).unwrap()),
                "{text}"
            );
            assert_eq!(coerce(Some(&value.render()), col).unwrap(), value, "{text}");
        }

        let precise = coerce(Some("0.123456789012345678901234567891"), &fine).unwrap();
        assert_eq!(precise.render(), "0.123456789012345678901234567891");
    }

    #[test]
    fn dates_parse_common_layouts() {
        let col = column("HIRED", DialectType::Date, true);
        let expected = datetime(2023, 11, 5, 14, 30, 0);
        for text in [
            "2023-11-05 14:30:00",
            "2023-11-05T14:30:00",
            "2023/11/05 14:30:00",
            "2023-11-05 14:30",
            "2023-11-05T14:30:00Z",
            "2023-11-05T16:30:00+02:00",
        ] {
            assert_eq!(
                coerce(Some(text), &col).unwrap(),
                TypedValue::DateTime(expected),
                "{text}"
            );
        }
        assert_eq!(
            coerce(Some("2023-11-05"), &col).unwrap(),
            TypedValue::DateTime(datetime(2023, 11, 5, 0, 0, 0))
        );
        assert!(coerce(Some("05.11.2023"), &col).is_err());
        assert!(coerce(Some("2023-02-30"), &col).is_err());
    }

    #[test]
    fn text_passes_through_untouched() {
        let col = column("NAME", DialectType::Text, true);
        assert_eq!(
            coerce(Some("  a,\"b\"  "), &col).unwrap(),
            TypedValue::Text("  a,\"b\"  ".to_string())
        );
    }

    #[test]
    fn rendered_values_coerce_to_the_same_value() {
        let cases = [
            (column("N", DialectType::NumericIntegerOrDecimal, false), "0042"),
            (
                with_scale(column("D", DialectType::NumericIntegerOrDecimal, false), Some(3)),
                "-12.500",
            ),
            (column("F", DialectType::NumericFloat, false), "6.02e2"),
            (column("T", DialectType::Date, false), "2024/01/31 23:59:59.125"),
            (column("S", DialectType::Text, false), "plain text"),
        ];

        for (col, text) in cases {
            let first = coerce(Some(text), &col).unwrap();
            let second = coerce(Some(&first.render()), &col).unwrap();
            assert_eq!(first, second, "{text}");
        }
    }

    #[test]
    fn row_coercion_follows_schema_order() {
        let schema = TableSchema::new(
            "EMP",
            vec![
                ColumnDefinition {
                    ordinal: 1,
                    ..column("SEQ_EMP", DialectType::NumericIntegerOrDecimal, false)
                },
                ColumnDefinition {
                    ordinal: 2,
                    ..column("NAME", DialectType::Text, true)
                },
            ],
        )
        .unwrap();

        let raw = RawRow::from_pairs([("name", Some("A")), ("seq_emp", Some("1"))]);
        let row = coerce_row(&raw, &schema).unwrap();
        assert_eq!(
            row.values(),
            &[TypedValue::Integer(1), TypedValue::Text("A".to_string())]
        );

        let missing_name = RawRow::from_pairs([("SEQ_EMP", Some("2"))]);
        let row = coerce_row(&missing_name, &schema).unwrap();
        assert_eq!(row.values()[1], TypedValue::Null(DialectType::Text));
    }

    #[test]
    fn unknown_header_is_schema_mismatch() {
        let schema = TableSchema::new(
            "EMP",
            vec![column("NAME", DialectType::Text, true)],
        )
        .unwrap();
        let raw = RawRow::from_pairs([("NAME", Some("D")), ("EXTRA", Some("x"))]);
        match coerce_row(&raw, &schema) {
            Err(Error::SchemaMismatch { table, column }) => {
                assert_eq!(table, "EMP");
                assert_eq!(column, "EXTRA");
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }
}
