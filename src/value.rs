//! Decoded cell values.
//!
//! [`Value`] is a closed sum type with one variant per decoded kind, so
//! container decoders compose over a known, finite set of cases.

use std::net::{Ipv4Addr, Ipv6Addr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use num_bigint::{BigInt, BigUint};
use uuid::Uuid;

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null (from a Nullable mask, a LowCardinality null slot, or `Nothing`)
    Null,
    /// Boolean value
    Bool(bool),

    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(BigUint),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(BigInt),

    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 text (String and FixedString)
    String(String),
    /// Exact fixed-point decimal
    Decimal(BigDecimal),
    /// Calendar date
    Date(NaiveDate),
    /// UTC instant with up to nanosecond precision
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),

    /// Variable-length sequence
    Array(Vec<Value>),
    /// Key/value pairs in wire order, keys unique
    Map(Vec<(Value, Value)>),
    /// Fixed-arity tuple
    Tuple(Vec<Value>),
}

impl Value {
    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean value, if this is a Bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text value, if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer value as i64, if this is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Int128(v) => i64::try_from(*v).ok(),
            Value::Int256(v) => i64::try_from(v).ok(),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::UInt128(v) => i64::try_from(*v).ok(),
            Value::UInt256(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Integer value as u64, if this is a non-negative integer that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt8(v) => Some(u64::from(*v)),
            Value::UInt16(v) => Some(u64::from(*v)),
            Value::UInt32(v) => Some(u64::from(*v)),
            Value::UInt64(v) => Some(*v),
            Value::UInt128(v) => u64::try_from(*v).ok(),
            Value::UInt256(v) => u64::try_from(v).ok(),
            Value::Int8(v) => u64::try_from(*v).ok(),
            Value::Int16(v) => u64::try_from(*v).ok(),
            Value::Int32(v) => u64::try_from(*v).ok(),
            Value::Int64(v) => u64::try_from(*v).ok(),
            Value::Int128(v) => u64::try_from(*v).ok(),
            Value::Int256(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Floating point value, widening Float32.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Decimal value, if this is a Decimal.
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    /// Elements, if this is an Array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Elements, if this is a Tuple.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Entries, if this is a Map.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    /// Look up a key in a Map value.
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Convert to a JSON value.
    ///
    /// Integers wider than 64 bits that do not fit are rendered as strings,
    /// as are decimals, dates, instants, UUIDs and addresses. Maps become
    /// arrays of `[key, value]` pairs since keys need not be strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::UInt8(v) => Json::from(*v),
            Value::UInt16(v) => Json::from(*v),
            Value::UInt32(v) => Json::from(*v),
            Value::UInt64(v) => Json::from(*v),
            Value::UInt128(v) => match u64::try_from(*v) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(v.to_string()),
            },
            Value::UInt256(v) => match u64::try_from(v) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(v.to_string()),
            },
            Value::Int8(v) => Json::from(*v),
            Value::Int16(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::Int128(v) => match i64::try_from(*v) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(v.to_string()),
            },
            Value::Int256(v) => match i64::try_from(v) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(v.to_string()),
            },
            Value::Float32(f) => serde_json::Number::from_f64(f64::from(*f))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Float64(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Decimal(d) => Json::String(d.to_plain_string()),
            Value::Date(d) => Json::String(d.to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Ipv4(ip) => Json::String(ip.to_string()),
            Value::Ipv6(ip) => Json::String(ip.to_string()),
            Value::Array(items) | Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Array(
                entries
                    .iter()
                    .map(|(k, v)| Json::Array(vec![k.to_json(), v.to_json()]))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
