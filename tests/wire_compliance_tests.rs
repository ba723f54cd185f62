//! Wire-level compliance tests for the Native decoder.
//!
//! Each test assembles a complete response body byte by byte and checks the
//! decoded `Response`, covering block framing, scalar widths and the nesting
//! rules of the container types.

use std::io::Cursor;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chnative::{
    encode_varint, read_native, BufferedSource, NativeReader, ReaderError, SliceSource,
    SourceError, Value,
};

// ============================================================================
// Stream Builder
// ============================================================================

/// Assembles Native blocks for tests.
#[derive(Default)]
struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn block(mut self, columns: u64, rows: u64) -> Self {
        self.bytes.extend(encode_varint(columns));
        self.bytes.extend(encode_varint(rows));
        self
    }

    fn empty_block(self) -> Self {
        self.block(0, 0)
    }

    fn string(mut self, s: &str) -> Self {
        self.bytes.extend(encode_varint(s.len() as u64));
        self.bytes.extend_from_slice(s.as_bytes());
        self
    }

    fn column(self, name: &str, type_str: &str) -> Self {
        self.string(name).string(type_str)
    }

    fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn u64(self, value: u64) -> Self {
        self.raw(&value.to_le_bytes())
    }

    fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn column_values(response: &chnative::Response, index: usize) -> Vec<Value> {
    response
        .rows()
        .iter()
        .map(|row| row[index].clone())
        .collect()
}

// ============================================================================
// Block Framing
// ============================================================================

#[test]
fn test_minimal_uint8_stream() {
    let bytes = vec![
        0x01, 0x01, 0x01, b'x', 0x05, b'U', b'I', b'n', b't', b'8', 0x7F,
    ];
    let response = read_native(bytes).unwrap();
    assert_eq!(response.columns(), ["x"]);
    assert_eq!(response.types(), ["UInt8"]);
    assert_eq!(response.rows(), [vec![Value::UInt8(127)]]);
}

#[test]
fn test_empty_block_is_a_no_op() {
    let bytes = StreamBuilder::new()
        .empty_block()
        .block(1, 2)
        .column("n", "UInt16")
        .raw(&[1, 0, 2, 0])
        .empty_block()
        .block(1, 1)
        .column("n", "UInt16")
        .raw(&[3, 0])
        .empty_block()
        .build();

    let response = read_native(bytes).unwrap();
    assert_eq!(response.columns(), ["n"]);
    assert_eq!(response.types(), ["UInt16"]);
    assert_eq!(
        column_values(&response, 0),
        vec![Value::UInt16(1), Value::UInt16(2), Value::UInt16(3)]
    );
}

#[test]
fn test_empty_body() {
    let response = read_native(Vec::new()).unwrap();
    assert!(response.is_empty());
    assert!(response.columns().is_empty());
    assert!(response.types().is_empty());
}

#[test]
fn test_block_with_columns_and_zero_rows() {
    let bytes = StreamBuilder::new()
        .block(2, 0)
        .column("a", "String")
        .column("b", "Array(UInt8)")
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(response.columns(), ["a", "b"]);
    assert_eq!(response.types(), ["String", "Array(UInt8)"]);
    assert!(response.is_empty());
}

#[test]
fn test_multiple_columns_are_row_aligned() {
    let bytes = StreamBuilder::new()
        .block(3, 2)
        .column("id", "UInt32")
        .raw(&[1, 0, 0, 0, 2, 0, 0, 0])
        .column("name", "String")
        .string("Alice")
        .string("Bob")
        .column("score", "Float64")
        .raw(&1.5f64.to_le_bytes())
        .raw(&(-2.25f64).to_le_bytes())
        .build();

    let response = read_native(bytes).unwrap();
    assert_eq!(
        response.rows(),
        [
            vec![Value::UInt32(1), Value::from("Alice"), Value::Float64(1.5)],
            vec![Value::UInt32(2), Value::from("Bob"), Value::Float64(-2.25)],
        ]
    );
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_decimal_is_exact() {
    let bytes = StreamBuilder::new()
        .block(1, 1)
        .column("d", "Decimal(18, 6)")
        .raw(&123_456_789_123_456i64.to_le_bytes())
        .build();
    let response = read_native(bytes).unwrap();
    let value = response.get(0, "d").unwrap();
    assert_eq!(
        value.as_decimal(),
        Some(&BigDecimal::from_str("123456789.123456").unwrap())
    );
    assert_eq!(value.to_json(), serde_json::json!("123456789.123456"));
}

#[test]
fn test_int256_negative_one() {
    let bytes = StreamBuilder::new()
        .block(1, 1)
        .column("big", "Int256")
        .raw(&[0xFF; 32])
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(response.get(0, "big").unwrap().as_i64(), Some(-1));
}

#[test]
fn test_datetime_ignores_timezone() {
    let bytes = StreamBuilder::new()
        .block(1, 1)
        .column("t", "DateTime('Asia/Tokyo')")
        .raw(&1_700_000_000u32.to_le_bytes())
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        response.get(0, "t").unwrap().to_json(),
        serde_json::json!("2023-11-14T22:13:20Z")
    );
}

#[test]
fn test_uuid_and_ipv4() {
    let mut uuid_bytes = [0u8; 16];
    // 00112233-4455-6677-8899-aabbccddeeff, halves stored little-endian
    uuid_bytes[..8].copy_from_slice(&[0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
    uuid_bytes[8..].copy_from_slice(&[0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA, 0x99, 0x88]);

    let bytes = StreamBuilder::new()
        .block(2, 1)
        .column("id", "UUID")
        .raw(&uuid_bytes)
        .column("ip", "IPv4")
        .raw(&[0x01, 0x00, 0x00, 0x7F])
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        response.get(0, "id").unwrap().to_json(),
        serde_json::json!("00112233-4455-6677-8899-aabbccddeeff")
    );
    assert_eq!(
        response.get(0, "ip").unwrap().to_json(),
        serde_json::json!("127.0.0.1")
    );
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_nullable_mask_discards_masked_value() {
    let bytes = StreamBuilder::new()
        .block(1, 2)
        .column("n", "Nullable(UInt8)")
        .raw(&[0, 1])
        .raw(&[5, 9])
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        column_values(&response, 0),
        vec![Value::UInt8(5), Value::Null]
    );
}

#[test]
fn test_array_rows_follow_offsets() {
    let bytes = StreamBuilder::new()
        .block(1, 3)
        .column("a", "Array(String)")
        .u64(2)
        .u64(2)
        .u64(3)
        .string("x")
        .string("y")
        .string("z")
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        column_values(&response, 0),
        vec![
            Value::Array(vec![Value::from("x"), Value::from("y")]),
            Value::Array(vec![]),
            Value::Array(vec![Value::from("z")]),
        ]
    );
}

#[test]
fn test_decreasing_offsets_are_rejected() {
    let bytes = StreamBuilder::new()
        .block(1, 2)
        .column("a", "Array(UInt8)")
        .u64(2)
        .u64(1)
        .raw(&[1, 2])
        .build();
    match read_native(bytes).unwrap_err() {
        ReaderError::Decode { column, .. } => assert_eq!(column, "a"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_map_of_tuples() {
    // Map(String, Tuple(UInt8, UInt8)) with one row {"a": (1, 2), "b": (3, 4)}
    let bytes = StreamBuilder::new()
        .block(1, 1)
        .column("m", "Map(String, Tuple(UInt8, UInt8))")
        .u64(2)
        .string("a")
        .string("b")
        .raw(&[1, 3])
        .raw(&[2, 4])
        .build();
    let response = read_native(bytes).unwrap();
    let map = response.get(0, "m").unwrap();
    assert_eq!(
        map.map_get(&Value::from("a")),
        Some(&Value::Tuple(vec![Value::UInt8(1), Value::UInt8(2)]))
    );
    assert_eq!(
        map.map_get(&Value::from("b")),
        Some(&Value::Tuple(vec![Value::UInt8(3), Value::UInt8(4)]))
    );
    assert_eq!(map.as_map().unwrap().len(), 2);
}

#[test]
fn test_low_cardinality_two_byte_keys() {
    let entries: Vec<String> = (0..300).map(|i| format!("v{}", i)).collect();
    let keys: Vec<u16> = (0..600u16).map(|i| (i * 7) % 300).collect();

    let mut builder = StreamBuilder::new()
        .block(1, keys.len() as u64)
        .column("lc", "LowCardinality(String)")
        .u64(1)
        .u64(1)
        .u64(entries.len() as u64);
    for entry in &entries {
        builder = builder.string(entry);
    }
    builder = builder.u64(keys.len() as u64);
    for key in &keys {
        builder = builder.raw(&key.to_le_bytes());
    }

    let response = read_native(builder.build()).unwrap();
    assert_eq!(response.len(), keys.len());
    for (row, key) in response.rows().iter().zip(&keys) {
        assert_eq!(row[0].as_str(), Some(entries[*key as usize].as_str()));
    }
    let distinct: std::collections::HashSet<&str> = response
        .rows()
        .iter()
        .filter_map(|row| row[0].as_str())
        .collect();
    assert_eq!(distinct.len(), 300);
}

#[test]
fn test_low_cardinality_nullable_slot_zero() {
    let bytes = StreamBuilder::new()
        .block(1, 3)
        .column("lc", "LowCardinality(Nullable(String))")
        .u64(1)
        .u64(0)
        .u64(2)
        .string("")
        .string("x")
        .u64(3)
        .raw(&[1, 0, 1])
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        column_values(&response, 0),
        vec![Value::from("x"), Value::Null, Value::from("x")]
    );
}

#[test]
fn test_empty_tuple_consumes_filler_bytes() {
    let bytes = StreamBuilder::new()
        .block(2, 2)
        .column("t", "Tuple()")
        .raw(&[0, 0])
        .column("n", "UInt8")
        .raw(&[7, 8])
        .build();
    let response = read_native(bytes).unwrap();
    assert_eq!(
        response.rows(),
        [
            vec![Value::Tuple(vec![]), Value::UInt8(7)],
            vec![Value::Tuple(vec![]), Value::UInt8(8)],
        ]
    );
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unsupported_type_fails_whole_parse() {
    let bytes = StreamBuilder::new()
        .block(1, 1)
        .column("ok", "UInt8")
        .raw(&[1])
        .block(1, 1)
        .column("j", "Object('json')")
        .raw(&[0])
        .build();
    let err = read_native(bytes).unwrap_err();
    assert!(err.is_unsupported_type());
    assert!(err.to_string().contains("Object('json')"));
}

#[test]
fn test_truncated_column_is_source_error() {
    let bytes = StreamBuilder::new()
        .block(1, 2)
        .column("n", "UInt32")
        .raw(&[1, 0, 0, 0, 2])
        .build();
    assert!(matches!(
        read_native(bytes),
        Err(ReaderError::Source(SourceError::UnexpectedEof { .. }))
    ));
}

// ============================================================================
// Streaming Sources
// ============================================================================

#[test]
fn test_buffered_source_across_chunk_boundaries() {
    let mut builder = StreamBuilder::new();
    for block in 0..4u64 {
        builder = builder.block(2, 50).column("id", "UInt64");
        for row in 0..50 {
            builder = builder.u64(block * 50 + row);
        }
        builder = builder.column("label", "String");
        for row in 0..50 {
            builder = builder.string(&format!("row-{}", block * 50 + row));
        }
    }
    let bytes = builder.build();

    let from_slice = read_native(bytes.clone()).unwrap();
    let source = BufferedSource::with_chunk_size(Cursor::new(bytes), 7);
    let mut reader = NativeReader::new(source);
    let streamed = reader.read_response().unwrap();

    assert_eq!(streamed, from_slice);
    assert_eq!(streamed.len(), 200);
    assert_eq!(reader.blocks_read(), 4);
    assert_eq!(
        streamed.get(199, "label"),
        Some(&Value::from("row-199"))
    );
}

#[test]
fn test_block_by_block_iteration() {
    let bytes = StreamBuilder::new()
        .block(1, 2)
        .column("n", "Int8")
        .raw(&[0xFF, 0x01])
        .empty_block()
        .block(1, 1)
        .column("n", "Int8")
        .raw(&[0x80])
        .build();

    let reader = NativeReader::new(SliceSource::new(bytes));
    let blocks: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].index, 0);
    assert_eq!(
        blocks[0].column("n").unwrap(),
        [Value::Int8(-1), Value::Int8(1)]
    );
    assert_eq!(blocks[1].column("n").unwrap(), [Value::Int8(-128)]);
}
