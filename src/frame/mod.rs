//! LZ4 Frame Format
//!
//! As defined in <https://github.com/lz4/lz4/blob/dev/doc/lz4_Frame_format.md>
//!
//! This module implements the decode side only: recognising General,
//! Legacy and Skippable frames, driving the block decoder across a
//! sequence of blocks, and exposing the result as an ordinary
//! `std::io::Read`. There is no encoder here, and dictionary-assisted
//! decoding is out of scope — `header::FrameDescriptor::dictionary_id` is
//! parsed and surfaced but never consulted during decode.

use std::io::{self, Read};
use std::{error, fmt};

pub(crate) mod decompress;
pub(crate) mod header;

pub use decompress::{Decompressor, DecompressorOptions};
pub use header::{BlockMode, BlockSize, FrameDescriptor};

/// Errors produced while parsing or decoding the LZ4 frame container.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Decompression error from the block layer.
    DecompressionError(crate::block::DecompressError),
    /// An `io::Error` was encountered reading the underlying source.
    Io(io::Error),
    /// The 4-byte magic number didn't match General, Legacy, or any Skippable value.
    InvalidMagic(u32),
    /// Frame descriptor version field is not 1.
    UnsupportedVersion(u8),
    /// A reserved bit was set in the flags or block-data byte.
    ReservedBitsNonZero,
    /// The block-data byte's `max_size` enum is outside 4..=7.
    InvalidBlockSize(u8),
    /// The frame header checksum did not match the computed value.
    BadFrameHeader,
    /// A block's declared size exceeds the frame's `max_size`.
    BlockTooBig,
    /// A compressed block's payload was truncated.
    ShortRead,
    /// The underlying source hit EOF at a non-terminal position (mid-frame).
    EndOfStream,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DecompressionError(e) => write!(f, "block decompression failed: {e}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::InvalidMagic(m) => write!(f, "unrecognised frame magic number: {m:#010x}"),
            Error::UnsupportedVersion(v) => write!(f, "unsupported frame version: {v}"),
            Error::ReservedBitsNonZero => f.write_str("a reserved header bit was set"),
            Error::InvalidBlockSize(v) => write!(f, "invalid block max-size enum: {v}"),
            Error::BadFrameHeader => f.write_str("frame header checksum mismatch"),
            Error::BlockTooBig => f.write_str("block's declared size exceeds the frame's max_size"),
            Error::ShortRead => f.write_str("compressed block payload was truncated"),
            Error::EndOfStream => f.write_str("unexpected end of stream inside a frame"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::DecompressionError(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Decompresses all bytes of `input` into a new `Vec`.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = Decompressor::new(input);
    let mut out = Vec::with_capacity(input.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Decompresses from `input` into `output`, copying until EOF.
pub fn decompress_into(input: &mut impl Read, output: &mut impl io::Write) -> Result<u64, Error> {
    let mut decoder = Decompressor::new(input);
    Ok(io::copy(&mut decoder, output)?)
}
