//! Native stream reader components
//!
//! This module provides the core reading functionality for Native bodies,
//! including varint framing, block reading, streaming, and column decoding.

mod block;
pub mod decode;
pub mod stream;
pub mod varint;

pub use block::{Block, BlockReader, ColumnDef};
pub use decode::{decode_column, read_string, read_u64};
pub use stream::{read_native, NativeReader};
pub use varint::{decode_varint, encode_varint};
