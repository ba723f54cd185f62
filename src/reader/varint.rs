//! Shared varint encoding and decoding utilities.
//!
//! The Native format frames block headers and string lengths with unsigned
//! LEB128 integers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Groups are in little-endian order
//!
//! There is no zigzag layer; every varint in the format is unsigned.

use crate::error::DecodeError;
use crate::source::ByteSource;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer from a byte source.
///
/// If the source reaches end of stream in the middle of a varint, decoding
/// stops and the value accumulated so far is returned. The stream reader
/// relies on this at the tail of a response: a clean stream only ever hits
/// it there, never inside a block.
///
/// # Errors
/// - `DecodeError::InvalidVarint` if the varint exceeds 10 bytes
/// - `DecodeError::Source` if the source itself fails
#[inline]
pub fn decode_varint<S: ByteSource + ?Sized>(source: &mut S) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(byte) = source.read_byte()? else {
            return Ok(result);
        };

        // Add the 7 data bits to the result
        result |= ((byte & 0x7F) as u64) << shift;

        // Check if this is the last byte (MSB is 0)
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;

        // Prevent overflow (max 10 bytes for 64-bit varint)
        if shift >= 64 {
            return Err(DecodeError::InvalidVarint);
        }
    }
}

/// Decode a varint and convert it to a `usize` length or count.
#[inline]
pub fn decode_varint_usize<S: ByteSource + ?Sized>(source: &mut S) -> Result<usize, DecodeError> {
    let value = decode_varint(source)?;
    usize::try_from(value).map_err(|_| {
        DecodeError::InvalidData(format!("Length {} does not fit in usize", value))
    })
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Encode an unsigned integer as LEB128.
///
/// Produces between 1 and 10 bytes; the decoder accepts exactly this form.
#[inline]
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}
