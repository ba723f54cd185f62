//! Byte sources for Native response bodies
//!
//! The decoder reads through the [`ByteSource`] trait; a transport hands it
//! either a fully buffered body ([`SliceSource`]) or a streaming reader
//! ([`BufferedSource`]).

mod buffered;
mod slice;
mod traits;

pub use buffered::{BufferedSource, DEFAULT_CHUNK_SIZE};
pub use slice::SliceSource;
pub use traits::{BoxedSource, ByteSource};
