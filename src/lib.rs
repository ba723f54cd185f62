//! Streaming decoder for the ClickHouse Native columnar format
//!
//! This library decodes Native response bodies into row-oriented values,
//! supporting both fully buffered and streaming byte sources. A thin client
//! layer builds queries from a connection configuration and leaves the HTTP
//! exchange to a pluggable transport.
//!
//! # Example
//! ```
//! use chnative::{read_native, Value};
//!
//! let mut body = vec![0x01, 0x02, 0x02, b'i', b'd', 0x06];
//! body.extend_from_slice(b"UInt16");
//! body.extend_from_slice(&[0x01, 0x00, 0x02, 0x00]);
//!
//! let response = read_native(body).unwrap();
//! assert_eq!(response.columns(), ["id"]);
//! assert_eq!(response.get(1, "id"), Some(&Value::UInt16(2)));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod reader;
pub mod response;
pub mod schema;
pub mod source;
pub mod value;

// Re-export main types
pub use client::{Connection, QueryOptions, QueryRequest, Transport, TransportResult};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError, DecodeError, ReaderError, SchemaError, SourceError};
pub use reader::{
    decode_column, decode_varint, encode_varint, read_native, Block, BlockReader, ColumnDef,
    NativeReader,
};
pub use response::{Response, Summary};
pub use schema::{parse_column_type, ColumnType, TupleElement};
pub use source::{BoxedSource, BufferedSource, ByteSource, SliceSource};
pub use value::Value;
