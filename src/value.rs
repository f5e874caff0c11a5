// src/value.rs

//! The dynamic attribute bag representation shared by the transformer host
//! and the Object Engine: raw storage values widened with the extra
//! representations a datatype's read transform can produce (decimal, date,
//! datetime) before an assignment's own transform narrows them back down.
//!
//! Three of the GLOSSARY's representations map onto this type at different
//! pipeline stages: raw values only ever use the first five variants (they
//! are exactly what the storage engine can hold); unprocessed and processed
//! values may additionally be [`Value::Decimal`], [`Value::Date`], or
//! [`Value::DateTime`].

use crate::db::adapter::RawValue;
use crate::error::{Error, Result};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Decimal(BigDecimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Hand-written rather than derived: `Decimal`/`Date`/`DateTime` serialize as
/// plain strings so the CLI's `--json` dump/info output stays readable
/// without pulling in `chrono`'s/`bigdecimal`'s own `serde` feature flags.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
            Value::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
            Value::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
        }
    }
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Integer(i) => Value::Integer(i),
            RawValue::Real(f) => Value::Real(f),
            RawValue::Text(t) => Value::Text(t),
            RawValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<&RawValue> for Value {
    fn from(raw: &RawValue) -> Self {
        Value::from(raw.clone())
    }
}

impl Value {
    /// Narrows a pipeline value back down to an engine-storable [`RawValue`].
    /// A value reaching a root datatype's generator column is expected to
    /// already be one of the five storage-native shapes; `Decimal`/`Date`/
    /// `DateTime` surviving to this point means the DDL's write transformer
    /// chain did not fully unwind them, which is a transformer authoring bug
    /// rather than a recoverable condition.
    pub fn into_raw(self) -> Result<RawValue> {
        match self {
            Value::Null => Ok(RawValue::Null),
            Value::Integer(i) => Ok(RawValue::Integer(i)),
            Value::Real(f) => Ok(RawValue::Real(f)),
            Value::Text(t) => Ok(RawValue::Text(t)),
            Value::Blob(b) => Ok(RawValue::Blob(b)),
            other => Err(Error::TransformError(format!(
                "write pipeline left a non-storable value ({other:?}) unresolved; \
                 the datatype chain's write transformers must reduce to integer/real/text/blob/null"
            ))),
        }
    }
}

/// `decimal_from_units(units, digits)` — `units / 10^digits` as a `Decimal`.
pub fn decimal_from_units(units: i64, digits: u32) -> BigDecimal {
    BigDecimal::from(units) / BigDecimal::from(10i64.pow(digits))
}

/// `decimal_to_units(decimal, digits)` — the inverse of `decimal_from_units`.
pub fn decimal_to_units(decimal: &BigDecimal, digits: u32) -> Result<i64> {
    let scaled = decimal * BigDecimal::from(10i64.pow(digits));
    scaled
        .to_i64()
        .ok_or_else(|| Error::TransformError(format!("decimal '{scaled}' does not fit in an i64 after scaling by 10^{digits}")))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::TransformError(format!("invalid date '{s}': {e}")))
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| Error::TransformError(format!("invalid datetime '{s}': {e}")))
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_roundtrip() {
        let units = 123;
        let decimal = decimal_from_units(units, 2);
        assert_eq!(decimal.to_string(), "1.23");
        assert_eq!(decimal_to_units(&decimal, 2).unwrap(), 123);
    }

    #[test]
    fn date_roundtrip() {
        let d = parse_date("2026-07-28").unwrap();
        assert_eq!(format_date(&d), "2026-07-28");
    }

    #[test]
    fn raw_roundtrip_for_storage_native_variants() {
        let v = Value::Integer(42);
        assert_eq!(v.into_raw().unwrap(), RawValue::Integer(42));
    }

    #[test]
    fn unresolved_decimal_is_a_transform_error() {
        let v = Value::Decimal(decimal_from_units(100, 2));
        assert!(v.into_raw().is_err());
    }

    #[test]
    fn decimal_and_date_serialize_as_json_strings() {
        let decimal = Value::Decimal(decimal_from_units(499, 2));
        assert_eq!(serde_json::to_string(&decimal).unwrap(), "\"4.99\"");

        let date = Value::Date(parse_date("2026-07-28").unwrap());
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2026-07-28\"");

        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Integer(7)).unwrap(), "7");
    }
}
