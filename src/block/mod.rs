//! The LZ4 block format: <https://github.com/lz4/lz4/blob/dev/doc/lz4_Block_format.md>
//!
//! ```text
//! [Token] 1 byte: [Literal Length (4 bit)][Match Length (4 bit)]
//! [Optional Literal Length bytes] [Literal bytes] [Offset, 2 bytes LE] [Optional Match Length bytes]
//! ```
//!
//! A block has no length prefix of its own; the caller (the frame engine, see
//! [`crate::frame`]) already knows how many compressed bytes make up the
//! block and passes exactly that slice to [`decompress::decompress_internal`].

pub mod decompress;

pub use decompress::{decompress, decompress_into};

use core::fmt;

/// Minimum length of a match back-reference (the length field is stored
/// with an implicit +4 bias, since a shorter match could never be worth the
/// 2-3 bytes needed to encode it).
pub(crate) const MINMATCH: usize = 4;

/// An error representing invalid or truncated compressed block data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressError {
    /// The compressed stream ended in the middle of a literal run or a
    /// variable-length integer continuation.
    IncompleteData,
    /// Fewer bytes remained than required for a 2-byte match offset.
    NotEnoughData,
    /// The match offset is zero, or points before the start of the output
    /// (i.e. `offset > cursor`).
    OffsetOutOfBounds,
    /// The decoded output would not fit into the caller-provided buffer.
    OutputTooSmall {
        expected_size: usize,
        actual_size: usize,
    },
    /// The decompressed size differs from the size the caller announced.
    UncompressedSizeDiffers { expected: usize, actual: usize },
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::IncompleteData => {
                f.write_str("compressed block ended mid-literal-run or mid-varint")
            }
            DecompressError::NotEnoughData => {
                f.write_str("not enough bytes remaining for a match offset")
            }
            DecompressError::OffsetOutOfBounds => {
                f.write_str("match offset is zero or points before the start of the output")
            }
            DecompressError::OutputTooSmall {
                expected_size,
                actual_size,
            } => write!(
                f,
                "output buffer ({actual_size} bytes) is too small for the decompressed data ({expected_size} bytes needed)"
            ),
            DecompressError::UncompressedSizeDiffers { expected, actual } => write!(
                f,
                "the expected decompressed size is {expected}, actual {actual}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecompressError {}
