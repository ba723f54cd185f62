//! Streaming Native reader
//!
//! The `NativeReader` is the main entry point for decoding a response body.
//! It drives a `BlockReader` over a byte source and either hands out blocks
//! one at a time or collects the whole stream into a [`Response`].

use bytes::Bytes;
use tracing::info;

use crate::error::ReaderError;
use crate::reader::block::{Block, BlockReader};
use crate::response::Response;
use crate::source::{ByteSource, SliceSource};
use crate::value::Value;

/// Streaming reader for Native format bodies.
///
/// Columns and types are taken from the first block that carries columns;
/// later blocks of the same stream are expected to repeat them.
///
/// # Example
/// ```
/// use chnative::reader::NativeReader;
/// use chnative::source::SliceSource;
/// use chnative::Value;
///
/// let bytes = vec![0x01, 0x01, 0x01, b'x', 0x05, b'U', b'I', b'n', b't', b'8', 0x7F];
/// let response = NativeReader::new(SliceSource::new(bytes)).read_response().unwrap();
/// assert_eq!(response.columns(), ["x"]);
/// assert_eq!(response.types(), ["UInt8"]);
/// assert_eq!(response.rows(), [vec![Value::UInt8(127)]]);
/// ```
#[derive(Debug)]
pub struct NativeReader<S> {
    blocks: BlockReader<S>,
}

impl<S: ByteSource> NativeReader<S> {
    /// Create a reader over a response body.
    pub fn new(source: S) -> Self {
        Self {
            blocks: BlockReader::new(source),
        }
    }

    /// Read the next block, skipping empty markers.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn next_block(&mut self) -> Result<Option<Block>, ReaderError> {
        self.blocks.next_block()
    }

    /// Number of non-empty blocks read so far.
    pub fn blocks_read(&self) -> usize {
        self.blocks.blocks_read()
    }

    /// Whether the stream is exhausted.
    pub fn is_finished(&self) -> bool {
        self.blocks.is_finished()
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> S {
        self.blocks.into_inner()
    }

    /// Decode the rest of the stream into a single response.
    ///
    /// Fails as a whole: no partial response is returned on error.
    ///
    /// # Errors
    /// - `ReaderError::Schema` for an unsupported or malformed column type
    /// - `ReaderError::Decode` for invalid column data
    /// - `ReaderError::Source` if the stream ends early or the source fails
    pub fn read_response(&mut self) -> Result<Response, ReaderError> {
        let mut header: Option<(Vec<String>, Vec<String>)> = None;
        let mut rows: Vec<Vec<Value>> = Vec::new();

        while let Some(block) = self.next_block()? {
            if block.column_count() == 0 {
                continue;
            }

            let expected = header.as_ref().map(|(columns, _)| columns.len());
            match expected {
                None => {
                    header = Some((
                        block.columns.iter().map(|c| c.name.clone()).collect(),
                        block.columns.iter().map(|c| c.type_name.clone()).collect(),
                    ));
                }
                Some(expected) if expected != block.column_count() => {
                    return Err(ReaderError::Decode {
                        block_index: block.index,
                        column: String::new(),
                        message: format!(
                            "Block has {} columns, expected {}",
                            block.column_count(),
                            expected
                        ),
                    });
                }
                Some(_) => {}
            }
            rows.extend(block.into_rows());
        }

        let (columns, types) = header.unwrap_or_default();
        info!(
            blocks = self.blocks_read(),
            rows = rows.len(),
            columns = columns.len(),
            "Finished reading Native stream"
        );
        Ok(Response::new(columns, types, rows))
    }
}

impl<S: ByteSource> Iterator for NativeReader<S> {
    type Item = Result<Block, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

/// Decode a complete in-memory Native body.
///
/// # Example
/// ```
/// let response = chnative::read_native(Vec::new()).unwrap();
/// assert!(response.is_empty());
/// ```
pub fn read_native(body: impl Into<Bytes>) -> Result<Response, ReaderError> {
    NativeReader::new(SliceSource::new(body)).read_response()
}
