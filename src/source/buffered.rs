//! Buffered source over a streaming reader
//!
//! Pulls the body from any `std::io::Read` in chunks, so a response can be
//! decoded while it is still arriving.

use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};

use super::traits::ByteSource;
use crate::error::SourceError;

/// Default refill size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A byte source that buffers a streaming reader.
pub struct BufferedSource<R> {
    inner: R,
    buffer: BytesMut,
    chunk_size: usize,
    eof: bool,
}

impl<R: Read> BufferedSource<R> {
    /// Wrap a reader with the default chunk size.
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap a reader, refilling `chunk_size` bytes at a time.
    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            chunk_size: chunk_size.max(1),
            eof: false,
        }
    }

    /// Discard everything left in the stream.
    ///
    /// Returns the number of bytes dropped.
    pub fn drain(&mut self) -> Result<u64, SourceError> {
        let mut dropped = self.buffer.len() as u64;
        self.buffer.clear();
        dropped += std::io::copy(&mut self.inner, &mut std::io::sink())?;
        self.eof = true;
        Ok(dropped)
    }

    /// Consume the source, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pull one more chunk into the buffer. Returns `false` at end of stream.
    fn fill(&mut self) -> Result<bool, SourceError> {
        if self.eof {
            return Ok(false);
        }

        let start = self.buffer.len();
        self.buffer.resize(start + self.chunk_size, 0);
        let read = loop {
            match self.inner.read(&mut self.buffer[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(SourceError::Io(e));
                }
            }
        };
        self.buffer.truncate(start + read);

        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }
}

impl<R: Read> ByteSource for BufferedSource<R> {
    fn read_exact(&mut self, len: usize) -> Result<Bytes, SourceError> {
        while self.buffer.len() < len {
            if !self.fill()? {
                return Err(SourceError::UnexpectedEof {
                    requested: len,
                    available: self.buffer.len(),
                });
            }
        }
        Ok(self.buffer.split_to(len).freeze())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        if self.buffer.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buffer.get_u8()))
    }

    fn is_at_end(&mut self) -> Result<bool, SourceError> {
        if self.buffer.is_empty() {
            self.fill()?;
        }
        Ok(self.buffer.is_empty())
    }
}

impl<R> std::fmt::Debug for BufferedSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSource")
            .field("buffered", &self.buffer.len())
            .field("chunk_size", &self.chunk_size)
            .field("eof", &self.eof)
            .finish()
    }
}
