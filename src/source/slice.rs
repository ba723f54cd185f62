//! In-memory source implementation
//!
//! Serves a fully buffered response body with a known length.

use bytes::Bytes;

use super::traits::ByteSource;
use crate::error::SourceError;

/// A byte source over a complete in-memory body.
///
/// Reads are zero-copy slices of the underlying `Bytes`.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Bytes,
    position: usize,
}

impl SliceSource {
    /// Wrap a complete body.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Current read offset from the start of the body.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Total body length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for SliceSource {
    fn read_exact(&mut self, len: usize) -> Result<Bytes, SourceError> {
        let available = self.remaining();
        if len > available {
            return Err(SourceError::UnexpectedEof {
                requested: len,
                available,
            });
        }

        let chunk = self.data.slice(self.position..self.position + len);
        self.position += len;
        Ok(chunk)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        let byte = self.data.get(self.position).copied();
        if byte.is_some() {
            self.position += 1;
        }
        Ok(byte)
    }

    fn is_at_end(&mut self) -> Result<bool, SourceError> {
        Ok(self.position >= self.data.len())
    }
}

impl From<Vec<u8>> for SliceSource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<Bytes> for SliceSource {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}
