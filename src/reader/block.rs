//! Native block parsing and reading
//!
//! A Native stream is a sequence of blocks, each containing:
//! - Column count (varint)
//! - Row count (varint)
//! - Per column: name (string), type (string), column data
//!
//! A block with zero columns and zero rows is an empty marker and carries
//! nothing; the `BlockReader` skips it.

use tracing::{debug, trace};

use crate::error::{DecodeError, ReaderError};
use crate::reader::decode::{decode_column, read_string};
use crate::reader::varint::decode_varint_usize;
use crate::schema::{parse_column_type, ColumnType};
use crate::source::ByteSource;
use crate::value::Value;

/// Cap on column capacity reserved from a block header.
const MAX_PREALLOC_COLUMNS: usize = 1024;

/// Name and type of one column as sent in a block.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Type string exactly as sent by the server
    pub type_name: String,
    /// Parsed type
    pub column_type: ColumnType,
}

/// A single decoded block.
///
/// Data is column-major: `data[c][r]` is row `r` of column `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Sequential block number (0-indexed, empty markers not counted)
    pub index: usize,
    /// Column definitions in wire order
    pub columns: Vec<ColumnDef>,
    /// Number of rows in every column
    pub row_count: usize,
    /// Decoded column data
    pub data: Vec<Vec<Value>>,
}

impl Block {
    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the block carries no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        self.data.get(index).map(Vec::as_slice)
    }

    /// Transpose the column-major data into rows.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        // Row count follows the decoded data, never the header alone
        let rows = self.data.iter().map(Vec::len).min().unwrap_or(0);
        let mut columns: Vec<_> = self.data.into_iter().map(Vec::into_iter).collect();
        (0..rows)
            .map(|_| columns.iter_mut().filter_map(|column| column.next()).collect())
            .collect()
    }
}

/// Reads blocks one at a time from a byte source.
///
/// # Example
/// ```
/// use chnative::reader::BlockReader;
/// use chnative::source::SliceSource;
///
/// let bytes = vec![0x01, 0x01, 0x01, b'x', 0x05, b'U', b'I', b'n', b't', b'8', 0x7F];
/// let mut reader = BlockReader::new(SliceSource::new(bytes));
/// let block = reader.next_block().unwrap().unwrap();
/// assert_eq!(block.row_count, 1);
/// assert!(reader.next_block().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct BlockReader<S> {
    source: S,
    block_index: usize,
    finished: bool,
}

impl<S: ByteSource> BlockReader<S> {
    /// Create a reader positioned at the start of a stream.
    pub fn new(source: S) -> Self {
        Self {
            source,
            block_index: 0,
            finished: false,
        }
    }

    /// Read the next non-empty block.
    ///
    /// Returns `Ok(None)` once the source is exhausted. Any error leaves the
    /// reader finished; the stream cannot be resynchronized.
    pub fn next_block(&mut self) -> Result<Option<Block>, ReaderError> {
        if self.finished {
            return Ok(None);
        }

        let result = self.read_block();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    /// Number of blocks returned so far.
    pub fn blocks_read(&self) -> usize {
        self.block_index
    }

    /// Whether the end of the stream (or an error) has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_block(&mut self) -> Result<Option<Block>, ReaderError> {
        loop {
            if self.source.is_at_end()? {
                return Ok(None);
            }

            let index = self.block_index;
            let num_columns =
                decode_varint_usize(&mut self.source).map_err(|e| with_context(e, index, ""))?;
            let num_rows =
                decode_varint_usize(&mut self.source).map_err(|e| with_context(e, index, ""))?;

            // Without columns there is no data to read, whatever the row count says
            if num_columns == 0 {
                debug!(block_index = index, rows = num_rows, "Skipping empty block");
                continue;
            }

            let mut columns = Vec::with_capacity(num_columns.min(MAX_PREALLOC_COLUMNS));
            let mut data = Vec::with_capacity(num_columns.min(MAX_PREALLOC_COLUMNS));
            for _ in 0..num_columns {
                let name =
                    read_string(&mut self.source).map_err(|e| with_context(e, index, ""))?;
                let type_name =
                    read_string(&mut self.source).map_err(|e| with_context(e, index, &name))?;
                let column_type = parse_column_type(&type_name)?;
                trace!(
                    block_index = index,
                    name = %name,
                    column_type = %type_name,
                    "Decoding column"
                );

                let values = decode_column(&mut self.source, &column_type, num_rows)
                    .map_err(|e| with_context(e, index, &name))?;
                data.push(values);
                columns.push(ColumnDef {
                    name,
                    type_name,
                    column_type,
                });
            }

            debug!(
                block_index = index,
                columns = num_columns,
                rows = num_rows,
                "Decoded block"
            );
            self.block_index += 1;
            return Ok(Some(Block {
                index,
                columns,
                row_count: num_rows,
                data,
            }));
        }
    }
}

/// Attach block and column context to a decode error. Source failures stay
/// source failures.
fn with_context(err: DecodeError, block_index: usize, column: &str) -> ReaderError {
    match err {
        DecodeError::Source(source) => ReaderError::Source(source),
        other => ReaderError::Decode {
            block_index,
            column: column.to_string(),
            message: other.to_string(),
        },
    }
}
