//! Typed JSON decoding into columnar batches.
//!
//! Rules that are easy to get wrong and are pinned down here:
//!
//! - Integral literals must be sign and digits only. Fractions and exponent
//!   notation do not decode into integral columns even when the value would
//!   be integral.
//! - Floats accept the string tokens `NaN`, `+INF`, `+Infinity`, `Infinity`,
//!   `-INF`, and `-Infinity`. A *numeric* literal large enough to coerce to
//!   an infinity is out of range and fails; the tokens are the only way to
//!   produce non-finite values.
//! - Decimals are parsed at full precision from the literal text, never
//!   through an f64 intermediate.

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;

use crate::data::{ArrayValue, ColumnVector, ColumnarBatch, DecimalValue, MapValue, Scalar, StructValue};
use crate::error::{Error, TableResult};
use crate::schema::{DataType, DecimalType, PrimitiveType, StructType};
use crate::utils::require;

// Days between 0001-01-01 and 1970-01-01 in the proleptic Gregorian calendar.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Decodes a sequence of JSON records against `schema` into a
/// [`ColumnarBatch`].
///
/// Each row is either `None` (an entirely-null record) or a JSON object
/// text. Object keys are matched case-sensitively against field names;
/// missing keys decode to null and unknown keys are ignored. When a
/// `selection` mask is given, unselected rows are not parsed at all and
/// decode to all-null, whatever their content.
///
/// Any single field that fails to decode fails the whole call; no partial
/// batch is ever returned.
pub fn parse_json<'a>(
    rows: impl IntoIterator<Item = Option<&'a str>>,
    schema: &StructType,
    selection: Option<&[bool]>,
) -> TableResult<ColumnarBatch> {
    let rows: Vec<Option<&str>> = rows.into_iter().collect();
    if let Some(mask) = selection {
        require!(
            mask.len() == rows.len(),
            Error::generic(format!(
                "Selection mask holds {} entries for {} rows",
                mask.len(),
                rows.len()
            ))
        );
    }

    let mut columns: Vec<ColumnVector> = schema
        .fields()
        .map(|field| ColumnVector::new_empty(field.data_type()))
        .collect();

    for (index, row) in rows.iter().enumerate() {
        let selected = selection.map_or(true, |mask| mask[index]);
        let text = match (selected, row) {
            (false, _) | (true, None) => {
                for column in &mut columns {
                    column.push_null();
                }
                continue;
            }
            (true, Some(text)) => *text,
        };

        let record: Value = serde_json::from_str(text)?;
        match record {
            Value::Null => {
                for column in &mut columns {
                    column.push_null();
                }
            }
            Value::Object(object) => {
                for (field, column) in schema.fields().zip(columns.iter_mut()) {
                    match object.get(field.name()) {
                        None | Some(Value::Null) => column.push_null(),
                        Some(value) => {
                            let scalar = decode_value(value, field.data_type())?;
                            column.push_scalar(scalar)?;
                        }
                    }
                }
            }
            other => return Err(Error::decode(other, "a JSON object record")),
        }
    }

    Ok(ColumnarBatch::new(schema.clone(), columns, rows.len()))
}

fn decode_value(value: &Value, data_type: &DataType) -> TableResult<Scalar> {
    match data_type {
        DataType::Primitive(primitive) => decode_primitive(value, primitive),
        DataType::Array(array_type) => {
            let Value::Array(elements) = value else {
                return Err(Error::decode(value, data_type));
            };
            let elements = elements
                .iter()
                .map(|element| match element {
                    Value::Null if array_type.contains_null() => {
                        Ok(Scalar::Null(array_type.element_type().clone()))
                    }
                    Value::Null => Err(Error::decode("null", data_type)),
                    other => decode_value(other, array_type.element_type()),
                })
                .collect::<TableResult<Vec<_>>>()?;
            Ok(Scalar::Array(ArrayValue::new(elements)))
        }
        DataType::Map(map_type) => {
            let Value::Object(entries) = value else {
                return Err(Error::decode(value, data_type));
            };
            let entries = entries
                .iter()
                .map(|(key, entry)| {
                    let key = decode_map_key(key, map_type.key_type())?;
                    let entry = match entry {
                        Value::Null if map_type.value_contains_null() => {
                            Scalar::Null(map_type.value_type().clone())
                        }
                        Value::Null => return Err(Error::decode("null", data_type)),
                        other => decode_value(other, map_type.value_type())?,
                    };
                    Ok((key, entry))
                })
                .collect::<TableResult<Vec<_>>>()?;
            Ok(Scalar::Map(MapValue::new(entries)))
        }
        DataType::Struct(struct_type) => {
            let Value::Object(object) = value else {
                return Err(Error::decode(value, data_type));
            };
            let members = struct_type
                .fields()
                .map(|field| match object.get(field.name()) {
                    None | Some(Value::Null) => Ok(Scalar::Null(field.data_type().clone())),
                    Some(member) => decode_value(member, field.data_type()),
                })
                .collect::<TableResult<Vec<_>>>()?;
            Ok(Scalar::Struct(StructValue::new(members)))
        }
    }
}

// JSON object keys arrive as strings whatever the declared key type.
fn decode_map_key(key: &str, key_type: &DataType) -> TableResult<Scalar> {
    match key_type {
        DataType::Primitive(PrimitiveType::String) => Ok(Scalar::String(key.to_string())),
        DataType::Primitive(
            primitive @ (PrimitiveType::Byte
            | PrimitiveType::Short
            | PrimitiveType::Integer
            | PrimitiveType::Long),
        ) => decode_integral(key, *primitive),
        other => Err(Error::unsupported(format!(
            "Map keys of type {other} cannot be decoded from JSON object keys"
        ))),
    }
}

fn decode_primitive(value: &Value, primitive: &PrimitiveType) -> TableResult<Scalar> {
    let target = DataType::Primitive(*primitive);
    match primitive {
        PrimitiveType::Boolean => match value {
            Value::Bool(b) => Ok(Scalar::Boolean(*b)),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::Byte
        | PrimitiveType::Short
        | PrimitiveType::Integer
        | PrimitiveType::Long => match value {
            Value::Number(n) => decode_integral(&n.to_string(), *primitive),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::Float | PrimitiveType::Double => decode_floating(value, primitive),
        PrimitiveType::Decimal(decimal_type) => match value {
            Value::Number(n) => decode_decimal(&n.to_string(), *decimal_type),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::String => match value {
            Value::String(s) => Ok(Scalar::String(s.clone())),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::Binary => match value {
            Value::String(s) => Ok(Scalar::Binary(s.clone().into_bytes())),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::Date => match value {
            Value::String(s) => decode_date(s),
            other => Err(Error::decode(other, target)),
        },
        PrimitiveType::Timestamp => match value {
            Value::String(s) => decode_timestamp(s),
            other => Err(Error::decode(other, target)),
        },
    }
}

/// Parses an integral literal (sign and digits only) and range-checks it
/// against the target type.
fn decode_integral(literal: &str, primitive: PrimitiveType) -> TableResult<Scalar> {
    let target = DataType::Primitive(primitive);
    let digits = literal.strip_prefix('-').unwrap_or(literal);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::decode(literal, &target));
    }
    let parsed: i128 = literal
        .parse()
        .map_err(|_| Error::decode(literal, &target))?;
    let out_of_range = || Error::decode(literal, &target);
    match primitive {
        PrimitiveType::Byte => Ok(Scalar::Byte(
            i8::try_from(parsed).map_err(|_| out_of_range())?,
        )),
        PrimitiveType::Short => Ok(Scalar::Short(
            i16::try_from(parsed).map_err(|_| out_of_range())?,
        )),
        PrimitiveType::Integer => Ok(Scalar::Integer(
            i32::try_from(parsed).map_err(|_| out_of_range())?,
        )),
        PrimitiveType::Long => Ok(Scalar::Long(
            i64::try_from(parsed).map_err(|_| out_of_range())?,
        )),
        other => Err(Error::internal_error(format!(
            "decode_integral called for {other}"
        ))),
    }
}

fn decode_floating(value: &Value, primitive: &PrimitiveType) -> TableResult<Scalar> {
    let target = DataType::Primitive(*primitive);
    match value {
        Value::String(token) => {
            let special = match token.as_str() {
                "NaN" => f64::NAN,
                "+INF" | "+Infinity" | "Infinity" => f64::INFINITY,
                "-INF" | "-Infinity" => f64::NEG_INFINITY,
                other => return Err(Error::decode(other, target)),
            };
            match primitive {
                PrimitiveType::Float => Ok(Scalar::Float(special as f32)),
                _ => Ok(Scalar::Double(special)),
            }
        }
        Value::Number(n) => {
            let literal = n.to_string();
            let parsed: f64 = literal
                .parse()
                .map_err(|_| Error::decode(&literal, &target))?;
            // A numeric literal never produces an infinity. Overflowing the
            // finite range fails even though the parse itself succeeded.
            require!(parsed.is_finite(), Error::decode(&literal, &target));
            match primitive {
                PrimitiveType::Double => Ok(Scalar::Double(parsed)),
                PrimitiveType::Float => {
                    let narrowed = parsed as f32;
                    // Finite as f64 but out of the f32 finite range.
                    require!(narrowed.is_finite(), Error::decode(&literal, &target));
                    Ok(Scalar::Float(narrowed))
                }
                other => Err(Error::internal_error(format!(
                    "decode_floating called for {other}"
                ))),
            }
        }
        other => Err(Error::decode(other, target)),
    }
}

/// Parses a decimal literal at full precision. Accepts exponent notation.
/// Rescaling to the declared scale must be exact and the rescaled value must
/// fit in the declared precision.
fn decode_decimal(literal: &str, decimal_type: DecimalType) -> TableResult<Scalar> {
    let target = DataType::Primitive(PrimitiveType::Decimal(decimal_type));
    let fail = || Error::decode(literal, &target);

    let (mantissa, exponent) = match literal.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            (mantissa, exponent.parse::<i32>().map_err(|_| fail())?)
        }
        None => (literal, 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (-1i128, rest),
        None => (1i128, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (int_digits, frac_digits) = match mantissa.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (mantissa, ""),
    };
    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(fail());
    }

    let mut unscaled: i128 = 0;
    for byte in int_digits.bytes().chain(frac_digits.bytes()) {
        if !byte.is_ascii_digit() {
            return Err(fail());
        }
        unscaled = unscaled
            .checked_mul(10)
            .and_then(|n| n.checked_add(i128::from(byte - b'0')))
            .ok_or_else(fail)?;
    }
    unscaled *= sign;

    // Scale of the literal as written, then rescale to the declared scale.
    let literal_scale = i32::try_from(frac_digits.len()).map_err(|_| fail())? - exponent;
    let target_scale = i32::from(decimal_type.scale());
    if literal_scale < target_scale {
        let shift = u32::try_from(target_scale - literal_scale).map_err(|_| fail())?;
        let factor = 10i128.checked_pow(shift).ok_or_else(fail)?;
        unscaled = unscaled.checked_mul(factor).ok_or_else(fail)?;
    } else if literal_scale > target_scale {
        let shift = u32::try_from(literal_scale - target_scale).map_err(|_| fail())?;
        let factor = 10i128.checked_pow(shift).ok_or_else(fail)?;
        // Dropping nonzero digits would change the value.
        require!(unscaled % factor == 0, fail());
        unscaled /= factor;
    }

    require!(
        digit_count(unscaled) <= u32::from(decimal_type.precision()),
        fail()
    );
    Ok(Scalar::Decimal(DecimalValue::new(unscaled, decimal_type)))
}

fn digit_count(unscaled: i128) -> u32 {
    let mut remaining = unscaled.unsigned_abs();
    let mut digits = 1;
    while remaining >= 10 {
        remaining /= 10;
        digits += 1;
    }
    digits
}

fn decode_date(literal: &str) -> TableResult<Scalar> {
    let date = NaiveDate::parse_from_str(literal, "%Y-%m-%d")
        .map_err(|_| Error::decode(literal, DataType::DATE))?;
    Ok(Scalar::Date(
        date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE,
    ))
}

fn decode_timestamp(literal: &str) -> TableResult<Scalar> {
    let timestamp = DateTime::parse_from_rfc3339(literal)
        .map_err(|_| Error::decode(literal, DataType::TIMESTAMP))?;
    Ok(Scalar::Timestamp(timestamp.timestamp_micros()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructField;

    fn single_column_schema(data_type: DataType) -> StructType {
        StructType::try_new(vec![StructField::nullable("c", data_type)]).unwrap()
    }

    fn decode_one(json_value: &str, data_type: DataType) -> TableResult<ColumnarBatch> {
        let row = format!("{{\"c\": {json_value}}}");
        parse_json(vec![Some(row.as_str())], &single_column_schema(data_type), None)
    }

    #[track_caller]
    fn expect_decode_error(result: TableResult<ColumnarBatch>, literal: &str) {
        match result {
            Err(err @ Error::Decode { .. }) => {
                let message = err.to_string();
                assert!(
                    message.contains(&format!("Couldn't decode {literal}")),
                    "unexpected message: {message}"
                );
            }
            Err(other) => panic!("expected a decode error, got {other}"),
            Ok(_) => panic!("expected a decode error, got a batch"),
        }
    }

    #[test]
    fn integral_bounds() {
        let cases: Vec<(DataType, i128, i128)> = vec![
            (DataType::BYTE, i8::MIN as i128, i8::MAX as i128),
            (DataType::SHORT, i16::MIN as i128, i16::MAX as i128),
            (DataType::INTEGER, i32::MIN as i128, i32::MAX as i128),
            (DataType::LONG, i64::MIN as i128, i64::MAX as i128),
        ];
        for (data_type, min, max) in cases {
            for bound in [min, max] {
                let batch = decode_one(&bound.to_string(), data_type.clone()).unwrap();
                assert!(!batch.column(0).is_null_at(0));
            }
            expect_decode_error(
                decode_one(&(min - 1).to_string(), data_type.clone()),
                &(min - 1).to_string(),
            );
            expect_decode_error(
                decode_one(&(max + 1).to_string(), data_type.clone()),
                &(max + 1).to_string(),
            );
        }
    }

    #[test]
    fn integral_values_are_exact() {
        let batch = decode_one("-128", DataType::BYTE).unwrap();
        assert_eq!(batch.column(0).get_byte(0), Some(-128));
        let batch = decode_one("9223372036854775807", DataType::LONG).unwrap();
        assert_eq!(batch.column(0).get_long(0), Some(i64::MAX));
    }

    #[test]
    fn fractional_literal_does_not_decode_into_long() {
        expect_decode_error(decode_one("1.5", DataType::LONG), "1.5");
        expect_decode_error(decode_one("1e3", DataType::INTEGER), "1e3");
    }

    #[test]
    fn floating_special_tokens() {
        for (token, check) in [
            ("\"NaN\"", f64::is_nan as fn(f64) -> bool),
            ("\"+INF\"", |v| v == f64::INFINITY),
            ("\"+Infinity\"", |v| v == f64::INFINITY),
            ("\"Infinity\"", |v| v == f64::INFINITY),
            ("\"-INF\"", |v| v == f64::NEG_INFINITY),
            ("\"-Infinity\"", |v| v == f64::NEG_INFINITY),
        ] {
            let batch = decode_one(token, DataType::DOUBLE).unwrap();
            assert!(check(batch.column(0).get_double(0).unwrap()), "{token}");
            let batch = decode_one(token, DataType::FLOAT).unwrap();
            assert!(check(batch.column(0).get_float(0).unwrap() as f64), "{token}");
        }
    }

    #[test]
    fn floating_exponent_notation() {
        let batch = decode_one("1.25e2", DataType::DOUBLE).unwrap();
        assert_eq!(batch.column(0).get_double(0), Some(125.0));
    }

    #[test]
    fn numeric_overflow_to_infinity_is_a_decode_error() {
        expect_decode_error(decode_one("1e999", DataType::DOUBLE), "1e999");
        // Finite as f64, out of range for f32.
        expect_decode_error(decode_one("1e200", DataType::FLOAT), "1e200");
    }

    #[test]
    fn unknown_float_token_is_a_decode_error() {
        expect_decode_error(decode_one("\"inf\"", DataType::DOUBLE), "inf");
    }

    #[test]
    fn decimal_preserves_full_precision() {
        let literal = "123456789123456789123456789123456789";
        let batch = decode_one(literal, DataType::decimal(38, 0).unwrap()).unwrap();
        assert_eq!(
            batch.column(0).get_decimal(0),
            Some(123456789123456789123456789123456789i128)
        );
    }

    #[test]
    fn decimal_rescales_exactly() {
        let batch = decode_one("12.5", DataType::decimal(10, 3).unwrap()).unwrap();
        assert_eq!(batch.column(0).get_decimal(0), Some(12_500));
        let batch = decode_one("1.25e1", DataType::decimal(10, 1).unwrap()).unwrap();
        assert_eq!(batch.column(0).get_decimal(0), Some(125));
        let batch = decode_one("-0.070", DataType::decimal(5, 2).unwrap()).unwrap();
        assert_eq!(batch.column(0).get_decimal(0), Some(-7));
    }

    #[test]
    fn decimal_rejects_precision_and_scale_violations() {
        expect_decode_error(decode_one("12.345", DataType::decimal(10, 2).unwrap()), "12.345");
        expect_decode_error(decode_one("1000", DataType::decimal(3, 0).unwrap()), "1000");
    }

    #[test]
    fn string_passthrough_including_empty() {
        let batch = decode_one("\"\"", DataType::STRING).unwrap();
        assert_eq!(batch.column(0).get_string(0).map(String::as_str), Some(""));
        let batch = decode_one("\"hello\"", DataType::STRING).unwrap();
        assert_eq!(
            batch.column(0).get_string(0).map(String::as_str),
            Some("hello")
        );
    }

    #[test]
    fn date_decodes_to_epoch_days() {
        let batch = decode_one("\"1970-01-02\"", DataType::DATE).unwrap();
        assert_eq!(batch.column(0).get_date(0), Some(1));
        let batch = decode_one("\"1969-12-31\"", DataType::DATE).unwrap();
        assert_eq!(batch.column(0).get_date(0), Some(-1));
        let batch = decode_one("\"2024-02-29\"", DataType::DATE).unwrap();
        assert_eq!(batch.column(0).get_date(0), Some(19_782));
        expect_decode_error(decode_one("\"2024-13-01\"", DataType::DATE), "2024-13-01");
    }

    #[test]
    fn timestamp_decodes_to_utc_micros() {
        let batch = decode_one("\"1970-01-01T00:00:01Z\"", DataType::TIMESTAMP).unwrap();
        assert_eq!(batch.column(0).get_timestamp(0), Some(1_000_000));
        // Offset normalizes to UTC, fractional seconds kept to micros.
        let batch =
            decode_one("\"1970-01-01T01:00:00.123456+01:00\"", DataType::TIMESTAMP).unwrap();
        assert_eq!(batch.column(0).get_timestamp(0), Some(123_456));
        // No offset is not a valid literal.
        expect_decode_error(
            decode_one("\"1970-01-01T00:00:01\"", DataType::TIMESTAMP),
            "1970-01-01T00:00:01",
        );
    }

    #[test]
    fn null_record_yields_all_nulls_recursively() {
        let inner = StructType::try_new(vec![
            StructField::nullable("x", DataType::LONG),
            StructField::nullable("tags", DataType::array(DataType::STRING, true)),
        ])
        .unwrap();
        let schema = StructType::try_new(vec![
            StructField::nullable("a", DataType::INTEGER),
            StructField::nullable("nested", DataType::Struct(Box::new(inner))),
        ])
        .unwrap();
        let batch = parse_json(vec![None], &schema, None).unwrap();
        assert!(batch.column(0).is_null_at(0));
        let nested = batch.column(1).as_struct();
        assert!(batch.column(1).is_null_at(0));
        assert!(nested.child(0).is_null_at(0));
        assert!(nested.child(1).is_null_at(0));
    }

    #[test]
    fn selection_mask_skips_unparsed_rows() {
        let schema = single_column_schema(DataType::INTEGER);
        let rows = vec![Some("{\"c\": 1}"), Some("this is not json"), Some("{\"c\": 3}")];
        let batch = parse_json(rows, &schema, Some(&[true, false, true])).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.column(0).get_integer(0), Some(1));
        assert!(batch.column(0).is_null_at(1));
        assert_eq!(batch.column(0).get_integer(2), Some(3));
    }

    #[test]
    fn selection_mask_length_must_match() {
        let schema = single_column_schema(DataType::INTEGER);
        assert!(parse_json(vec![Some("{\"c\": 1}")], &schema, Some(&[true, false])).is_err());
    }

    #[test]
    fn missing_keys_are_null_and_unknown_keys_ignored() {
        let schema = StructType::try_new(vec![
            StructField::nullable("a", DataType::LONG),
            StructField::nullable("b", DataType::STRING),
        ])
        .unwrap();
        let batch = parse_json(
            vec![Some("{\"b\": \"kept\", \"unknown\": [1, 2]}")],
            &schema,
            None,
        )
        .unwrap();
        assert!(batch.column(0).is_null_at(0));
        assert_eq!(
            batch.column(1).get_string(0).map(String::as_str),
            Some("kept")
        );
    }

    #[test]
    fn field_names_match_case_sensitively() {
        let schema = single_column_schema(DataType::LONG);
        let batch = parse_json(vec![Some("{\"C\": 7}")], &schema, None).unwrap();
        assert!(batch.column(0).is_null_at(0));
    }

    #[test]
    fn nested_struct_array_map_decode() {
        let point = StructType::try_new(vec![
            StructField::nullable("x", DataType::INTEGER),
            StructField::nullable("y", DataType::INTEGER),
        ])
        .unwrap();
        let schema = StructType::try_new(vec![
            StructField::nullable("point", DataType::Struct(Box::new(point))),
            StructField::nullable("tags", DataType::array(DataType::STRING, true)),
            StructField::nullable("counts", DataType::map(DataType::STRING, DataType::LONG, true)),
        ])
        .unwrap();
        let row = r#"{
            "point": {"x": 1, "y": 2},
            "tags": ["a", null, "b"],
            "counts": {"k1": 10, "k2": null}
        }"#;
        let batch = parse_json(vec![Some(row)], &schema, None).unwrap();

        let point = batch.column(0).as_struct();
        assert_eq!(point.child(0).get_integer(0), Some(1));
        assert_eq!(point.child(1).get_integer(0), Some(2));

        let tags = batch.column(1).get_array(0).unwrap();
        assert_eq!(tags.elements().len(), 3);
        assert_eq!(tags.elements()[0], Scalar::String("a".to_string()));
        assert!(tags.elements()[1].is_null());

        let counts = batch.column(2).get_map(0).unwrap();
        assert_eq!(counts.len(), 2);
        let (key, value) = &counts.entries()[0];
        assert_eq!(*key, Scalar::String("k1".to_string()));
        assert_eq!(*value, Scalar::Long(10));
        assert!(counts.entries()[1].1.is_null());
    }

    #[test]
    fn null_struct_propagates_to_members() {
        let inner = StructType::try_new(vec![StructField::nullable("x", DataType::LONG)]).unwrap();
        let schema = StructType::try_new(vec![StructField::nullable(
            "nested",
            DataType::Struct(Box::new(inner)),
        )])
        .unwrap();
        let batch = parse_json(vec![Some("{\"nested\": null}")], &schema, None).unwrap();
        assert!(batch.column(0).is_null_at(0));
        assert!(batch.column(0).as_struct().child(0).is_null_at(0));
    }

    #[test]
    fn non_null_array_element_constraint() {
        let schema = single_column_schema(DataType::array(DataType::LONG, false));
        expect_decode_error(
            parse_json(vec![Some("{\"c\": [1, null]}")], &schema, None),
            "null",
        );
    }

    #[test]
    fn integral_map_keys() {
        let schema = single_column_schema(DataType::map(DataType::INTEGER, DataType::STRING, true));
        let batch = parse_json(vec![Some("{\"c\": {\"3\": \"three\"}}")], &schema, None).unwrap();
        let map = batch.column(0).get_map(0).unwrap();
        assert_eq!(map.entries()[0].0, Scalar::Integer(3));
    }

    #[test]
    fn single_bad_field_fails_the_whole_batch() {
        let schema = StructType::try_new(vec![
            StructField::nullable("good", DataType::LONG),
            StructField::nullable("bad", DataType::BYTE),
        ])
        .unwrap();
        let rows = vec![Some("{\"good\": 1, \"bad\": 1}"), Some("{\"good\": 2, \"bad\": 300}")];
        expect_decode_error(parse_json(rows, &schema, None), "300");
    }

    #[test]
    fn wrong_json_kind_is_a_decode_error() {
        expect_decode_error(decode_one("\"text\"", DataType::LONG), "\"text\"");
        expect_decode_error(decode_one("7", DataType::BOOLEAN), "7");
        expect_decode_error(decode_one("[1]", DataType::STRING), "[1]");
    }
}
