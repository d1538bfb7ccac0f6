use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

/// Text rendering used whenever a timestamp is turned into a string.
pub const DATE_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single cell as emitted by a tabular source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Date(NaiveDateTime),
    String(String),
    /// Undecoded cell content from a source that could not type it.
    Bytes(Vec<u8>),
}

/// Runtime kind tag of a [`RawValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Double,
    Date,
    String,
    Bytes,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::Double,
        ValueKind::Date,
        ValueKind::String,
        ValueKind::Bytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Date => "date",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RawValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RawValue::Int(_) => ValueKind::Int,
            RawValue::Long(_) => ValueKind::Long,
            RawValue::Double(_) => ValueKind::Double,
            RawValue::Date(_) => ValueKind::Date,
            RawValue::String(_) => ValueKind::String,
            RawValue::Bytes(_) => ValueKind::Bytes,
        }
    }
}

/// One source row; `None` marks a missing value. Indexed by `column id - 1`.
pub type Row = Vec<Option<RawValue>>;

/// A converted cell, typed by the field's output kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    String(String),
    Integer(i64),
    Number(f64),
    BigDecimal(Decimal),
    Date(NaiveDateTime),
}

impl OutputValue {
    pub fn as_display(&self) -> String {
        match self {
            OutputValue::String(s) => s.clone(),
            OutputValue::Integer(i) => i.to_string(),
            OutputValue::Number(f) => f.to_string(),
            OutputValue::BigDecimal(d) => d.to_string(),
            OutputValue::Date(dt) => dt.format(DATE_TEXT_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// One projected row, aligned to the emitted output fields.
pub type OutputRow = Vec<Option<OutputValue>>;

pub fn epoch_millis(value: &NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

pub fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parses date or date-time text; bare dates land on midnight.
pub fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    parse_naive_datetime(value).or_else(|| {
        parse_naive_date(value).and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}
