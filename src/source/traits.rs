//! ByteSource trait definition
//!
//! Provides the exact-length, strictly sequential read interface the
//! Native decoder consumes.

use bytes::Bytes;

use crate::error::SourceError;

/// Sequential byte source for a single response body.
///
/// The decoder only ever asks for exactly the number of bytes a value
/// occupies, never reads ahead, and never retries. Implementations may
/// block inside `read_exact` while waiting for the transport.
pub trait ByteSource {
    /// Read exactly `len` bytes.
    ///
    /// # Errors
    /// Returns `SourceError::UnexpectedEof` if the stream ends first.
    fn read_exact(&mut self, len: usize) -> Result<Bytes, SourceError>;

    /// Read a single byte, or `None` at end of stream.
    fn read_byte(&mut self) -> Result<Option<u8>, SourceError>;

    /// Whether the stream has no more bytes.
    fn is_at_end(&mut self) -> Result<bool, SourceError>;
}

/// A boxed ByteSource for dynamic dispatch
pub type BoxedSource = Box<dyn ByteSource + Send>;

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_exact(&mut self, len: usize) -> Result<Bytes, SourceError> {
        (**self).read_exact(len)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        (**self).read_byte()
    }

    fn is_at_end(&mut self) -> Result<bool, SourceError> {
        (**self).is_at_end()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_exact(&mut self, len: usize) -> Result<Bytes, SourceError> {
        (**self).read_exact(len)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        (**self).read_byte()
    }

    fn is_at_end(&mut self) -> Result<bool, SourceError> {
        (**self).is_at_end()
    }
}
