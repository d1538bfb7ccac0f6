//! Cell conversion from source value kinds into output kinds.
//!
//! [`coercion()`] is the rule table: one exhaustive match over every
//! `(ValueKind, OutputKind)` pair. [`convert()`] applies a rule to a value.
//! Values that cannot be parsed into the target become `None`; only value
//! kinds with no rule at all are reported as errors.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    data::{
        DATE_TEXT_FORMAT, OutputValue, RawValue, ValueKind, epoch_millis, from_epoch_millis,
        parse_temporal,
    },
    error::UnsupportedValue,
    schema::OutputKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// The value already has the output kind's representation.
    Native,
    /// A conversion rule exists.
    Convert,
    /// No target type; the value is dropped to null.
    Discard,
    /// The value kind has no rule for this target.
    Unsupported,
}

pub fn coercion(kind: ValueKind, output: OutputKind) -> Coercion {
    match (kind, output) {
        (
            ValueKind::Bytes,
            OutputKind::String
            | OutputKind::Integer
            | OutputKind::Number
            | OutputKind::BigDecimal
            | OutputKind::Date
            | OutputKind::Unset,
        ) => Coercion::Unsupported,
        (
            ValueKind::Int
            | ValueKind::Long
            | ValueKind::Double
            | ValueKind::Date
            | ValueKind::String,
            OutputKind::Unset,
        ) => Coercion::Discard,
        (ValueKind::Long, OutputKind::Integer)
        | (ValueKind::Double, OutputKind::Number)
        | (ValueKind::Date, OutputKind::Date)
        | (ValueKind::String, OutputKind::String) => Coercion::Native,
        (
            ValueKind::Int,
            OutputKind::String
            | OutputKind::Integer
            | OutputKind::Number
            | OutputKind::BigDecimal
            | OutputKind::Date,
        )
        | (
            ValueKind::Long,
            OutputKind::String | OutputKind::Number | OutputKind::BigDecimal | OutputKind::Date,
        )
        | (
            ValueKind::Double,
            OutputKind::String | OutputKind::Integer | OutputKind::BigDecimal | OutputKind::Date,
        )
        | (
            ValueKind::Date,
            OutputKind::String | OutputKind::Integer | OutputKind::Number | OutputKind::BigDecimal,
        )
        | (
            ValueKind::String,
            OutputKind::Integer | OutputKind::Number | OutputKind::BigDecimal | OutputKind::Date,
        ) => Coercion::Convert,
    }
}

pub fn needs_conversion(value: &RawValue, output: OutputKind) -> bool {
    coercion(value.kind(), output) != Coercion::Native
}

/// Converts `value` into `output`.
///
/// # Errors
///
/// Returns [`UnsupportedValue`] when the value kind has no rule for the target.
pub fn convert(
    value: &RawValue,
    output: OutputKind,
) -> Result<Option<OutputValue>, UnsupportedValue> {
    match coercion(value.kind(), output) {
        Coercion::Unsupported => Err(UnsupportedValue {
            observed: value.kind(),
            target: output,
        }),
        Coercion::Discard => Ok(None),
        Coercion::Native | Coercion::Convert => Ok(apply(value, output)),
    }
}

/// Converts an optional cell; a missing value stays missing whatever the target.
pub fn convert_cell(
    value: Option<&RawValue>,
    output: OutputKind,
) -> Result<Option<OutputValue>, UnsupportedValue> {
    match value {
        None => Ok(None),
        Some(value) if !needs_conversion(value, output) => Ok(native(value)),
        Some(value) => convert(value, output),
    }
}

fn native(value: &RawValue) -> Option<OutputValue> {
    match value {
        RawValue::Long(l) => Some(OutputValue::Integer(*l)),
        RawValue::Double(d) => Some(OutputValue::Number(*d)),
        RawValue::Date(dt) => Some(OutputValue::Date(*dt)),
        RawValue::String(s) => Some(OutputValue::String(s.clone())),
        RawValue::Int(_) | RawValue::Bytes(_) => None,
    }
}

fn apply(value: &RawValue, output: OutputKind) -> Option<OutputValue> {
    match (value, output) {
        (RawValue::Int(i), OutputKind::String) => Some(OutputValue::String(i.to_string())),
        (RawValue::Int(i), OutputKind::Integer) => Some(OutputValue::Integer(i64::from(*i))),
        (RawValue::Int(i), OutputKind::Number) => Some(OutputValue::Number(f64::from(*i))),
        (RawValue::Int(i), OutputKind::BigDecimal) => {
            Some(OutputValue::BigDecimal(Decimal::from(*i)))
        }
        (RawValue::Int(i), OutputKind::Date) => {
            from_epoch_millis(i64::from(*i)).map(OutputValue::Date)
        }

        (RawValue::Long(l), OutputKind::String) => Some(OutputValue::String(l.to_string())),
        (RawValue::Long(l), OutputKind::Integer) => Some(OutputValue::Integer(*l)),
        (RawValue::Long(l), OutputKind::Number) => Some(OutputValue::Number(*l as f64)),
        (RawValue::Long(l), OutputKind::BigDecimal) => {
            Some(OutputValue::BigDecimal(Decimal::from(*l)))
        }
        (RawValue::Long(l), OutputKind::Date) => from_epoch_millis(*l).map(OutputValue::Date),

        (RawValue::Double(d), OutputKind::String) => Some(OutputValue::String(d.to_string())),
        // `as` truncates toward zero and saturates, NaN becomes 0.
        (RawValue::Double(d), OutputKind::Integer) => Some(OutputValue::Integer(*d as i64)),
        (RawValue::Double(d), OutputKind::Number) => Some(OutputValue::Number(*d)),
        (RawValue::Double(d), OutputKind::BigDecimal) => {
            decimal_from_float(*d).map(OutputValue::BigDecimal)
        }
        (RawValue::Double(d), OutputKind::Date) => {
            from_epoch_millis(*d as i64).map(OutputValue::Date)
        }

        (RawValue::Date(dt), OutputKind::String) => {
            Some(OutputValue::String(dt.format(DATE_TEXT_FORMAT).to_string()))
        }
        (RawValue::Date(dt), OutputKind::Integer) => Some(OutputValue::Integer(epoch_millis(dt))),
        (RawValue::Date(dt), OutputKind::Number) => {
            Some(OutputValue::Number(epoch_millis(dt) as f64))
        }
        (RawValue::Date(dt), OutputKind::BigDecimal) => {
            Some(OutputValue::BigDecimal(Decimal::from(epoch_millis(dt))))
        }
        (RawValue::Date(dt), OutputKind::Date) => Some(OutputValue::Date(*dt)),

        (RawValue::String(s), OutputKind::String) => Some(OutputValue::String(s.clone())),
        (RawValue::String(s), OutputKind::Integer) => {
            s.trim().parse().ok().map(OutputValue::Integer)
        }
        (RawValue::String(s), OutputKind::Number) => {
            s.trim().parse().ok().map(OutputValue::Number)
        }
        (RawValue::String(s), OutputKind::BigDecimal) => {
            parse_decimal(s).map(OutputValue::BigDecimal)
        }
        (RawValue::String(s), OutputKind::Date) => parse_timestamp(s).map(OutputValue::Date),

        (RawValue::Bytes(_), _) | (_, OutputKind::Unset) => None,
    }
}

/// Goes through the shortest decimal text of `value` so that `0.1` becomes
/// exactly `0.1` rather than its binary expansion.
fn decimal_from_float(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    parse_decimal(&value.to_string())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Text is read as epoch milliseconds first, then as a date or date-time.
fn parse_timestamp(text: &str) -> Option<chrono::NaiveDateTime> {
    let trimmed = text.trim();
    match trimmed.parse::<i64>() {
        Ok(millis) => from_epoch_millis(millis),
        Err(_) => parse_temporal(trimmed),
    }
}
