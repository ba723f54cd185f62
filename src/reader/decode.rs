//! Native column decoders.
//!
//! Every decoder reads `rows` values of one column from a byte source and
//! returns them in row order. The Native format lays columns out
//! contiguously, so fixed-width types are read in a single request and
//! sliced into little-endian groups:
//! - Integers, floats and dates are little-endian
//! - Strings are varint length-prefixed
//! - Containers prefix their payload with masks or cumulative offsets

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};

use bigdecimal::BigDecimal;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use num_bigint::{BigInt, BigUint, Sign};
use tracing::warn;
use uuid::Uuid;

use crate::error::{DecodeError, SourceError};
use crate::reader::varint::decode_varint_usize;
use crate::schema::{decimal_storage_width, ColumnType, TupleElement};
use crate::source::ByteSource;
use crate::value::Value;

/// Cap on capacity reserved up front from counts read off the wire.
const MAX_PREALLOC: usize = 64 * 1024;

/// Day number of 1970-01-01 counted from 0001-01-01 as day 1.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Decode `rows` values of a column.
///
/// Containers recurse into this function for their element types.
///
/// # Errors
/// - `DecodeError::Source` if the stream ends inside the column
/// - `DecodeError::InvalidUtf8` for text that is not UTF-8
/// - `DecodeError::InvalidData` for structurally invalid data
pub fn decode_column<S: ByteSource + ?Sized>(
    source: &mut S,
    ty: &ColumnType,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    match ty {
        ColumnType::UInt8 => decode_fixed(source, rows, |b: [u8; 1]| Value::UInt8(b[0])),
        ColumnType::UInt16 => decode_fixed(source, rows, |b: [u8; 2]| {
            Value::UInt16(u16::from_le_bytes(b))
        }),
        ColumnType::UInt32 => decode_fixed(source, rows, |b: [u8; 4]| {
            Value::UInt32(u32::from_le_bytes(b))
        }),
        ColumnType::UInt64 => decode_fixed(source, rows, |b: [u8; 8]| {
            Value::UInt64(u64::from_le_bytes(b))
        }),
        ColumnType::UInt128 => decode_fixed(source, rows, |b: [u8; 16]| {
            Value::UInt128(u128::from_le_bytes(b))
        }),
        ColumnType::UInt256 => decode_fixed(source, rows, |b: [u8; 32]| {
            Value::UInt256(BigUint::from_bytes_le(&b))
        }),
        ColumnType::Int8 | ColumnType::Enum8(_) => {
            decode_fixed(source, rows, |b: [u8; 1]| Value::Int8(i8::from_le_bytes(b)))
        }
        ColumnType::Int16 | ColumnType::Enum16(_) => decode_fixed(source, rows, |b: [u8; 2]| {
            Value::Int16(i16::from_le_bytes(b))
        }),
        ColumnType::Int32 => decode_fixed(source, rows, |b: [u8; 4]| {
            Value::Int32(i32::from_le_bytes(b))
        }),
        ColumnType::Int64 => decode_fixed(source, rows, |b: [u8; 8]| {
            Value::Int64(i64::from_le_bytes(b))
        }),
        ColumnType::Int128 => decode_fixed(source, rows, |b: [u8; 16]| {
            Value::Int128(i128::from_le_bytes(b))
        }),
        ColumnType::Int256 => decode_fixed(source, rows, |b: [u8; 32]| {
            Value::Int256(signed_from_le(&b))
        }),
        ColumnType::Float32 => decode_fixed(source, rows, |b: [u8; 4]| {
            Value::Float32(f32::from_le_bytes(b))
        }),
        ColumnType::Float64 => decode_fixed(source, rows, |b: [u8; 8]| {
            Value::Float64(f64::from_le_bytes(b))
        }),
        ColumnType::Bool => decode_bools(source, rows),
        ColumnType::String => decode_strings(source, rows),
        ColumnType::FixedString(length) => decode_fixed_strings(source, *length, rows),
        ColumnType::Date => decode_fixed_try(source, rows, |b: [u8; 2]| {
            days_to_date(i32::from(u16::from_le_bytes(b)))
        }),
        ColumnType::Date32 => decode_fixed_try(source, rows, |b: [u8; 4]| {
            days_to_date(i32::from_le_bytes(b))
        }),
        ColumnType::DateTime { .. } => decode_fixed_try(source, rows, |b: [u8; 4]| {
            let seconds = u32::from_le_bytes(b);
            DateTime::from_timestamp(i64::from(seconds), 0)
                .map(Value::DateTime)
                .ok_or_else(|| {
                    DecodeError::InvalidData(format!("Timestamp {} out of range", seconds))
                })
        }),
        ColumnType::DateTime64 { precision, .. } => decode_datetime64(source, *precision, rows),
        ColumnType::Uuid => decode_fixed(source, rows, |mut b: [u8; 16]| {
            // Two little-endian 64-bit halves
            b[..8].reverse();
            b[8..].reverse();
            Value::Uuid(Uuid::from_bytes(b))
        }),
        ColumnType::Ipv4 => decode_fixed(source, rows, |b: [u8; 4]| {
            Value::Ipv4(Ipv4Addr::from(u32::from_le_bytes(b)))
        }),
        ColumnType::Ipv6 => decode_fixed(source, rows, |b: [u8; 16]| {
            Value::Ipv6(Ipv6Addr::from(b))
        }),
        ColumnType::Decimal { precision, scale } => {
            decode_decimals(source, *precision, *scale, rows)
        }
        ColumnType::Nothing => {
            source.read_exact(rows)?;
            Ok(vec![Value::Null; rows])
        }
        ColumnType::Nullable(inner) => decode_nullable(source, inner, rows),
        ColumnType::LowCardinality(inner) => decode_low_cardinality(source, inner, rows),
        ColumnType::Array(inner) => decode_array(source, inner, rows),
        ColumnType::Tuple(elements) => decode_tuple(source, elements, rows),
        ColumnType::Map(key, value) => decode_map(source, key, value, rows),
    }
}

/// Read one varint length-prefixed UTF-8 string.
///
/// Unlike a bare varint, a string cannot start at end of stream.
#[inline]
pub fn read_string<S: ByteSource + ?Sized>(source: &mut S) -> Result<String, DecodeError> {
    if source.is_at_end()? {
        return Err(SourceError::UnexpectedEof {
            requested: 1,
            available: 0,
        }
        .into());
    }
    let len = decode_varint_usize(source)?;
    let bytes = source.read_exact(len)?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Read one little-endian u64.
#[inline]
pub fn read_u64<S: ByteSource + ?Sized>(source: &mut S) -> Result<u64, DecodeError> {
    let bytes = source.read_exact(8)?;
    Ok(u64::from_le_bytes(le_array(&bytes)))
}

// ============================================================================
// Scalar Decoders
// ============================================================================

/// Read `rows` values of `width` bytes each in one request.
fn read_fixed_bytes<S: ByteSource + ?Sized>(
    source: &mut S,
    rows: usize,
    width: usize,
) -> Result<Bytes, DecodeError> {
    let len = rows.checked_mul(width).ok_or_else(|| {
        DecodeError::InvalidData(format!("{} rows of {} bytes overflow", rows, width))
    })?;
    Ok(source.read_exact(len)?)
}

fn decode_fixed<S, const N: usize, F>(
    source: &mut S,
    rows: usize,
    convert: F,
) -> Result<Vec<Value>, DecodeError>
where
    S: ByteSource + ?Sized,
    F: Fn([u8; N]) -> Value,
{
    decode_fixed_try(source, rows, |b: [u8; N]| Ok(convert(b)))
}

fn decode_fixed_try<S, const N: usize, F>(
    source: &mut S,
    rows: usize,
    convert: F,
) -> Result<Vec<Value>, DecodeError>
where
    S: ByteSource + ?Sized,
    F: Fn([u8; N]) -> Result<Value, DecodeError>,
{
    let bytes = read_fixed_bytes(source, rows, N)?;
    bytes
        .chunks_exact(N)
        .map(|chunk| convert(le_array(chunk)))
        .collect()
}

/// Copy a slice of known length into an array.
#[inline]
fn le_array<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&chunk[..N]);
    buf
}

/// Two's-complement value of a little-endian byte group: if the unsigned
/// value is at least 2^(bits-1), subtract 2^bits.
fn signed_from_le(bytes: &[u8]) -> BigInt {
    let unsigned = BigInt::from_bytes_le(Sign::Plus, bytes);
    if bytes.last().is_some_and(|b| b & 0x80 != 0) {
        unsigned - (BigInt::from(1u8) << (bytes.len() * 8))
    } else {
        unsigned
    }
}

fn decode_bools<S: ByteSource + ?Sized>(
    source: &mut S,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let bytes = read_fixed_bytes(source, rows, 1)?;
    let unexpected = bytes.iter().filter(|&&b| b > 1).count();
    if unexpected > 0 {
        warn!(
            count = unexpected,
            "Bool column holds bytes other than 0 and 1, decoding them as false"
        );
    }
    Ok(bytes.iter().map(|&b| Value::Bool(b == 1)).collect())
}

// ============================================================================
// Textual Decoders
// ============================================================================

fn decode_strings<S: ByteSource + ?Sized>(
    source: &mut S,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let mut values = Vec::with_capacity(rows.min(MAX_PREALLOC));
    for _ in 0..rows {
        values.push(Value::String(read_string(source)?));
    }
    Ok(values)
}

/// FixedString values keep their zero padding.
fn decode_fixed_strings<S: ByteSource + ?Sized>(
    source: &mut S,
    length: usize,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    if length == 0 {
        return Err(DecodeError::InvalidData(
            "FixedString length must be positive".to_string(),
        ));
    }
    let bytes = read_fixed_bytes(source, rows, length)?;
    bytes
        .chunks_exact(length)
        .map(|chunk| -> Result<Value, DecodeError> {
            Ok(Value::String(String::from_utf8(chunk.to_vec())?))
        })
        .collect()
}

// ============================================================================
// Temporal & Decimal Decoders
// ============================================================================

fn days_to_date(days: i32) -> Result<Value, DecodeError> {
    UNIX_EPOCH_DAYS_FROM_CE
        .checked_add(days)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(Value::Date)
        .ok_or_else(|| DecodeError::InvalidData(format!("Day number {} out of range", days)))
}

fn decode_datetime64<S: ByteSource + ?Sized>(
    source: &mut S,
    precision: u32,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let exponent = 9u32.checked_sub(precision).ok_or_else(|| {
        DecodeError::InvalidData(format!("DateTime64 precision {} exceeds 9", precision))
    })?;
    let nanos_per_tick = 10i128.pow(exponent);

    decode_fixed_try(source, rows, |b: [u8; 8]| {
        let ticks = i64::from_le_bytes(b);
        let nanos = i128::from(ticks) * nanos_per_tick;
        let seconds = nanos.div_euclid(NANOS_PER_SECOND);
        let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
        i64::try_from(seconds)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, subsec))
            .map(Value::DateTime)
            .ok_or_else(|| {
                DecodeError::InvalidData(format!(
                    "DateTime64 value {} with precision {} out of range",
                    ticks, precision
                ))
            })
    })
}

fn decode_decimals<S: ByteSource + ?Sized>(
    source: &mut S,
    precision: u32,
    scale: u32,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let width = decimal_storage_width(precision);
    let bytes = read_fixed_bytes(source, rows, width)?;
    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| {
            let unscaled = match width {
                4 => BigInt::from(i32::from_le_bytes(le_array(chunk))),
                8 => BigInt::from(i64::from_le_bytes(le_array(chunk))),
                _ => signed_from_le(chunk),
            };
            Value::Decimal(BigDecimal::new(unscaled, i64::from(scale)))
        })
        .collect())
}

// ============================================================================
// Container Decoders
// ============================================================================

fn decode_nullable<S: ByteSource + ?Sized>(
    source: &mut S,
    inner: &ColumnType,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let mask = read_fixed_bytes(source, rows, 1)?;
    // Values behind a null flag are still on the wire
    let values = decode_column(source, inner, rows)?;
    Ok(mask
        .iter()
        .zip(values)
        .map(|(&flag, value)| if flag == 1 { Value::Null } else { value })
        .collect())
}

/// Read `rows` cumulative u64 offsets, checking they never decrease.
fn read_offsets<S: ByteSource + ?Sized>(
    source: &mut S,
    rows: usize,
) -> Result<Vec<usize>, DecodeError> {
    let bytes = read_fixed_bytes(source, rows, 8)?;
    let mut offsets = Vec::with_capacity(rows.min(MAX_PREALLOC));
    let mut previous = 0usize;
    for chunk in bytes.chunks_exact(8) {
        let raw = u64::from_le_bytes(le_array(chunk));
        let offset = usize::try_from(raw).map_err(|_| {
            DecodeError::InvalidData(format!("Offset {} does not fit in usize", raw))
        })?;
        if offset < previous {
            return Err(DecodeError::InvalidData(format!(
                "Offsets must be non-decreasing, found {} after {}",
                offset, previous
            )));
        }
        offsets.push(offset);
        previous = offset;
    }
    Ok(offsets)
}

/// Slice a flat value sequence into per-row runs at cumulative offsets.
fn split_at_offsets(flat: Vec<Value>, offsets: &[usize]) -> Vec<Vec<Value>> {
    let mut flat = flat.into_iter();
    let mut start = 0;
    offsets
        .iter()
        .map(|&end| {
            let run: Vec<Value> = flat.by_ref().take(end - start).collect();
            start = end;
            run
        })
        .collect()
}

fn decode_array<S: ByteSource + ?Sized>(
    source: &mut S,
    inner: &ColumnType,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let offsets = read_offsets(source, rows)?;
    let total = offsets.last().copied().unwrap_or(0);
    if total == 0 {
        return Ok(vec![Value::Array(Vec::new()); rows]);
    }

    let items = decode_column(source, inner, total)?;
    Ok(split_at_offsets(items, &offsets)
        .into_iter()
        .map(Value::Array)
        .collect())
}

fn decode_map<S: ByteSource + ?Sized>(
    source: &mut S,
    key: &ColumnType,
    value: &ColumnType,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    let offsets = read_offsets(source, rows)?;
    let total = offsets.last().copied().unwrap_or(0);
    if total == 0 {
        return Ok(vec![Value::Map(Vec::new()); rows]);
    }

    let keys = decode_column(source, key, total)?;
    let values = decode_column(source, value, total)?;
    Ok(split_at_offsets(keys, &offsets)
        .into_iter()
        .zip(split_at_offsets(values, &offsets))
        .map(|(keys, values)| build_map(keys, values))
        .collect())
}

/// Pair keys with values. A repeated key keeps its first position and
/// takes the last value.
fn build_map(keys: Vec<Value>, values: Vec<Value>) -> Value {
    // Entry slot for every key, in first-seen order
    let (slots, unique) = {
        let mut first_seen: HashMap<MapKey<'_>, usize> = HashMap::with_capacity(keys.len());
        let mut slots = Vec::with_capacity(keys.len());
        for key in &keys {
            let next = first_seen.len();
            slots.push(*first_seen.entry(MapKey(key)).or_insert(next));
        }
        (slots, first_seen.len())
    };

    let mut entries: Vec<Option<(Value, Value)>> = (0..unique).map(|_| None).collect();
    for ((key, value), slot) in keys.into_iter().zip(values).zip(slots) {
        match &mut entries[slot] {
            Some((_, existing)) => *existing = value,
            empty => *empty = Some((key, value)),
        }
    }
    Value::Map(entries.into_iter().flatten().collect())
}

/// Hash-map view of a map key.
///
/// Equality is `Value`'s own, so a NaN key never matches another key.
/// Floats hash by bit pattern with `-0.0` folded into `0.0`.
struct MapKey<'a>(&'a Value);

impl PartialEq for MapKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MapKey<'_> {}

impl Hash for MapKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(v) => v.hash(state),
        Value::UInt8(v) => v.hash(state),
        Value::UInt16(v) => v.hash(state),
        Value::UInt32(v) => v.hash(state),
        Value::UInt64(v) => v.hash(state),
        Value::UInt128(v) => v.hash(state),
        Value::UInt256(v) => v.hash(state),
        Value::Int8(v) => v.hash(state),
        Value::Int16(v) => v.hash(state),
        Value::Int32(v) => v.hash(state),
        Value::Int64(v) => v.hash(state),
        Value::Int128(v) => v.hash(state),
        Value::Int256(v) => v.hash(state),
        Value::Float32(v) => (if *v == 0.0 { 0.0f32 } else { *v }).to_bits().hash(state),
        Value::Float64(v) => (if *v == 0.0 { 0.0f64 } else { *v }).to_bits().hash(state),
        Value::Decimal(v) => v.hash(state),
        Value::String(v) => v.hash(state),
        Value::Date(v) => v.hash(state),
        Value::DateTime(v) => v.hash(state),
        Value::Uuid(v) => v.hash(state),
        Value::Ipv4(v) => v.hash(state),
        Value::Ipv6(v) => v.hash(state),
        Value::Array(items) | Value::Tuple(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Map(entries) => {
            entries.len().hash(state);
            for (key, value) in entries {
                hash_value(key, state);
                hash_value(value, state);
            }
        }
    }
}

fn decode_tuple<S: ByteSource + ?Sized>(
    source: &mut S,
    elements: &[TupleElement],
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    if elements.is_empty() {
        // One filler byte per row
        source.read_exact(rows)?;
        return Ok(vec![Value::Tuple(Vec::new()); rows]);
    }

    let mut columns = Vec::with_capacity(elements.len());
    for element in elements {
        columns.push(decode_column(source, &element.ty, rows)?.into_iter());
    }

    Ok((0..rows)
        .map(|_| Value::Tuple(columns.iter_mut().filter_map(|column| column.next()).collect()))
        .collect())
}

fn decode_low_cardinality<S: ByteSource + ?Sized>(
    source: &mut S,
    inner: &ColumnType,
    rows: usize,
) -> Result<Vec<Value>, DecodeError> {
    // An empty column carries no version, dictionary or keys
    if rows == 0 {
        return Ok(Vec::new());
    }

    let _version = read_u64(source)?;
    let meta = read_u64(source)?;
    let key_width = match meta & 0xFF {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    };

    let dict_size = read_u64(source)?;
    let dict_size = usize::try_from(dict_size).map_err(|_| {
        DecodeError::InvalidData(format!("Dictionary size {} does not fit in usize", dict_size))
    })?;

    // A nullable dictionary is sent without a null map; slot 0 stands for null.
    let (dict_type, null_slot) = match inner {
        ColumnType::Nullable(value_type) => (value_type.as_ref(), true),
        other => (other, false),
    };
    let dictionary = decode_column(source, dict_type, dict_size)?;

    let _key_count = read_u64(source)?;
    let keys = read_fixed_bytes(source, rows, key_width)?;
    keys.chunks_exact(key_width)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf[..key_width].copy_from_slice(chunk);
            let index = u64::from_le_bytes(buf);
            if null_slot && index == 0 {
                return Ok(Value::Null);
            }
            usize::try_from(index)
                .ok()
                .and_then(|i| dictionary.get(i))
                .cloned()
                .ok_or_else(|| {
                    DecodeError::InvalidData(format!(
                        "Dictionary key {} out of range for {} entries",
                        index,
                        dictionary.len()
                    ))
                })
        })
        .collect()
}
