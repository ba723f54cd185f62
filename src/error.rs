//! Error types for Native format decoding

use std::io;
use thiserror::Error;

/// Errors raised by a byte source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The stream ended before a fixed-length value was complete
    #[error("Unexpected end of stream: requested {requested} bytes, {available} available")]
    UnexpectedEof { requested: usize, available: usize },
    /// IO error from the underlying reader
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can occur while parsing a column type string
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The type string matched no known type family
    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),
    /// The type string is syntactically broken
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A known type family with arguments it cannot accept
    #[error("Invalid type: {0}")]
    InvalidType(String),
}

/// Errors that can occur during column decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The byte source failed or ran short
    #[error("{0}")]
    Source(#[from] SourceError),
    /// Varint longer than 10 bytes
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Structurally invalid column data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Top-level error for reading a Native stream
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Decode error inside a column
    #[error("Decode error in block {block_index}, column '{column}': {message}")]
    Decode {
        block_index: usize,
        column: String,
        message: String,
    },

    /// Source error outside of column data (block header, names, types)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

impl ReaderError {
    /// Whether this error was caused by an unrecognized column type.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, ReaderError::Schema(SchemaError::UnsupportedType(_)))
    }
}

impl From<DecodeError> for ReaderError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Source(source) => ReaderError::Source(source),
            other => ReaderError::Decode {
                block_index: 0,
                column: String::new(),
                message: other.to_string(),
            },
        }
    }
}

/// Errors that can occur while building a client configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Only http and https are supported
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// The URL carries no host
    #[error("URL has no host")]
    MissingHost,
}

/// Errors surfaced by [`crate::client::Connection`]
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the query
    #[error("Query failed: {0}")]
    Query(String),
    /// The transport could not deliver the query or its response
    #[error("Transport error: {0}")]
    Transport(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The response body could not be decoded
    #[error("{0}")]
    Reader(#[from] ReaderError),
    /// The summary header is not valid JSON
    #[error("Invalid summary: {0}")]
    Summary(String),
}
