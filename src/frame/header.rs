//! Frame magic numbers and the General-frame descriptor.
//!
//! <https://github.com/lz4/lz4/blob/dev/doc/lz4_Frame_format.md>

use std::hash::Hasher;
use std::io::{self, Read};
use std::mem::size_of;

use twox_hash::XxHash32;

use super::Error;

/// LZ4 frame magic number (General frames).
pub const MAGIC_GENERAL: u32 = 0x184D2204;
/// LZ4 frame magic number (Legacy frames).
pub const MAGIC_LEGACY: u32 = 0x184C2102;
/// Inclusive range of skippable-frame magic numbers: `0x184D2A50..=0x184D2A5F`.
pub const MAGIC_SKIPPABLE_RANGE: core::ops::RangeInclusive<u32> = 0x184D2A50..=0x184D2A5F;

mod flags {
    pub const DICTIONARY_ID: u8 = 0b0000_0001;
    pub const RESERVED: u8 = 0b0000_0010;
    pub const CONTENT_CHECKSUM: u8 = 0b0000_0100;
    pub const CONTENT_SIZE: u8 = 0b0000_1000;
    pub const BLOCK_CHECKSUMS: u8 = 0b0001_0000;
    pub const INDEPENDENT_BLOCKS: u8 = 0b0010_0000;
    pub const VERSION_MASK: u8 = 0b1100_0000;
    pub const VERSION_SHIFT: u32 = 6;
    pub const SUPPORTED_VERSION: u8 = 1;
}

mod block_data {
    pub const RESERVED_LOW_MASK: u8 = 0b0000_1111;
    pub const MAX_SIZE_MASK: u8 = 0b0111_0000;
    pub const MAX_SIZE_SHIFT: u32 = 4;
    pub const RESERVED_HIGH_BIT: u8 = 0b1000_0000;
}

/// The block-size enum carried in the frame descriptor's block-data byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockSize {
    Max64KB = 4,
    Max256KB = 5,
    Max1MB = 6,
    Max4MB = 7,
}

impl BlockSize {
    /// Maximum size, in bytes, of a single block under this setting.
    pub fn get_size(&self) -> usize {
        match self {
            BlockSize::Max64KB => 64 * 1024,
            BlockSize::Max256KB => 256 * 1024,
            BlockSize::Max1MB => 1024 * 1024,
            BlockSize::Max4MB => 4 * 1024 * 1024,
        }
    }

    fn from_enum_value(v: u8) -> Result<Self, Error> {
        match v {
            4 => Ok(BlockSize::Max64KB),
            5 => Ok(BlockSize::Max256KB),
            6 => Ok(BlockSize::Max1MB),
            7 => Ok(BlockSize::Max4MB),
            other => Err(Error::InvalidBlockSize(other)),
        }
    }
}

/// Whether blocks may reference bytes decoded by a previous block in the
/// same frame. This crate parses and surfaces the flag but always decodes
/// each block independently — see `DESIGN.md` for why linked-mode
/// (prefix-window) decoding is out of scope alongside dictionary decode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockMode {
    Independent,
    Linked,
}

/// The parsed General-frame descriptor (flags byte, block-data byte, and
/// optional trailing fields).
#[derive(Clone, Debug)]
pub struct FrameDescriptor {
    pub content_size: Option<u64>,
    pub dictionary_id: Option<u32>,
    pub block_size: BlockSize,
    pub block_mode: BlockMode,
    pub block_checksums: bool,
    pub content_checksum: bool,
}

impl FrameDescriptor {
    /// Reads the frame descriptor that follows a General-frame magic number,
    /// optionally verifying the trailing header checksum.
    pub(crate) fn read<R: Read>(r: &mut R, verify_checksum: bool) -> Result<Self, Error> {
        // flags, block-data, content-size (opt), dictionary-id (opt): the
        // span the header checksum is computed over.
        let mut checked_bytes = [0u8; 1 + 1 + 8 + 4];
        let mut checked_len = 0;

        let mut head = [0u8; 2];
        r.read_exact(&mut head)?;
        checked_bytes[..2].copy_from_slice(&head);
        checked_len += 2;
        let flag_byte = head[0];
        let bd_byte = head[1];

        let version = (flag_byte & flags::VERSION_MASK) >> flags::VERSION_SHIFT;
        if version != flags::SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        if flag_byte & flags::RESERVED != 0 {
            return Err(Error::ReservedBitsNonZero);
        }
        if bd_byte & block_data::RESERVED_LOW_MASK != 0
            || bd_byte & block_data::RESERVED_HIGH_BIT != 0
        {
            return Err(Error::ReservedBitsNonZero);
        }

        let block_mode = if flag_byte & flags::INDEPENDENT_BLOCKS != 0 {
            BlockMode::Independent
        } else {
            BlockMode::Linked
        };
        let content_checksum = flag_byte & flags::CONTENT_CHECKSUM != 0;
        let block_checksums = flag_byte & flags::BLOCK_CHECKSUMS != 0;
        let block_size = BlockSize::from_enum_value(
            (bd_byte & block_data::MAX_SIZE_MASK) >> block_data::MAX_SIZE_SHIFT,
        )?;

        let mut content_size = None;
        if flag_byte & flags::CONTENT_SIZE != 0 {
            let mut buffer = [0u8; size_of::<u64>()];
            r.read_exact(&mut buffer)?;
            checked_bytes[checked_len..checked_len + 8].copy_from_slice(&buffer);
            checked_len += 8;
            content_size = Some(u64::from_le_bytes(buffer));
        }

        let mut dictionary_id = None;
        if flag_byte & flags::DICTIONARY_ID != 0 {
            let mut buffer = [0u8; size_of::<u32>()];
            r.read_exact(&mut buffer)?;
            checked_bytes[checked_len..checked_len + 4].copy_from_slice(&buffer);
            checked_len += 4;
            dictionary_id = Some(u32::from_le_bytes(buffer));
        }

        let mut checksum_buf = [0u8; 1];
        r.read_exact(&mut checksum_buf)?;
        let header_checksum = checksum_buf[0];

        if verify_checksum {
            let expected = compute_header_checksum(&checked_bytes[..checked_len]);
            if expected != header_checksum {
                return Err(Error::BadFrameHeader);
            }
        }

        Ok(FrameDescriptor {
            content_size,
            dictionary_id,
            block_size,
            block_mode,
            block_checksums,
            content_checksum,
        })
    }
}

/// Computes the single-byte header checksum: the second-lowest byte of
/// XXH32(seed=0) over the descriptor bytes preceding it.
pub(crate) fn compute_header_checksum(bytes: &[u8]) -> u8 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(bytes);
    ((hasher.finish() as u32) >> 8) as u8
}

/// A General-frame block header: a 32-bit LE word packed as `size` (low 31
/// bits) and `uncompressed` (top bit). All-zero is the end-of-frame mark.
pub(crate) enum BlockHeader {
    Compressed(u32),
    Uncompressed(u32),
    EndMark,
}

const UNCOMPRESSED_BIT: u32 = 0x8000_0000;

impl BlockHeader {
    pub(crate) fn from_word(word: u32) -> Self {
        if word == 0 {
            BlockHeader::EndMark
        } else if word & UNCOMPRESSED_BIT != 0 {
            BlockHeader::Uncompressed(word & !UNCOMPRESSED_BIT)
        } else {
            BlockHeader::Compressed(word)
        }
    }

    pub(crate) fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buffer = [0u8; 4];
        r.read_exact(&mut buffer)?;
        Ok(Self::from_word(u32::from_le_bytes(buffer)))
    }
}

/// Reads a little-endian `u32`.
pub(crate) fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buffer = [0u8; 4];
    r.read_exact(&mut buffer)?;
    Ok(u32::from_le_bytes(buffer))
}

/// Skips exactly `n` bytes forward on `r` without retaining them.
pub(crate) fn skip_bytes<R: Read>(r: &mut R, n: u64) -> io::Result<()> {
    io::copy(&mut r.by_ref().take(n), &mut io::sink())?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum MagicKind {
    General,
    Legacy,
    Skippable,
}

pub(crate) fn classify_magic(word: u32) -> Result<MagicKind, Error> {
    if word == MAGIC_GENERAL {
        Ok(MagicKind::General)
    } else if word == MAGIC_LEGACY {
        Ok(MagicKind::Legacy)
    } else if MAGIC_SKIPPABLE_RANGE.contains(&word) {
        Ok(MagicKind::Skippable)
    } else {
        Err(Error::InvalidMagic(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_checksum_matches_spec_fixture() {
        // Flags=0x40 (version=1, everything else off), block-data=0x40
        // (max_size=4 / 64KiB). This is the literal fixture quoted in the
        // frame format specification.
        assert_eq!(compute_header_checksum(&[0x40, 0x40]), 0xFE);
    }

    #[test]
    fn classify_magic_numbers() {
        assert_eq!(classify_magic(MAGIC_GENERAL).unwrap(), MagicKind::General);
        assert_eq!(classify_magic(MAGIC_LEGACY).unwrap(), MagicKind::Legacy);
        assert_eq!(classify_magic(0x184D2A50).unwrap(), MagicKind::Skippable);
        assert_eq!(classify_magic(0x184D2A5F).unwrap(), MagicKind::Skippable);
        assert!(classify_magic(0xdead_beef).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        // version bits = 0 (invalid), rest zero.
        let mut input: &[u8] = &[0x00, 0x40, 0xAA];
        let err = FrameDescriptor::read(&mut input, false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(0)));
    }

    #[test]
    fn rejects_reserved_block_data_bits() {
        // flags=0x40 (version=1), block-data low nibble set (reserved).
        let mut input: &[u8] = &[0x40, 0x41, 0xAA];
        let err = FrameDescriptor::read(&mut input, false).unwrap_err();
        assert!(matches!(err, Error::ReservedBitsNonZero));
    }

    #[test]
    fn rejects_invalid_block_size() {
        // flags=0x40, block-data max_size enum = 3 (invalid, must be 4..=7).
        let mut input: &[u8] = &[0x40, 0x30, 0xAA];
        let err = FrameDescriptor::read(&mut input, false).unwrap_err();
        assert!(matches!(err, Error::InvalidBlockSize(3)));
    }

    #[test]
    fn flips_any_bit_breaks_checksum() {
        let good = [0x40u8, 0x40];
        for bit in 0..16 {
            let mut bad = good;
            bad[bit / 8] ^= 1 << (bit % 8);
            assert_ne!(
                compute_header_checksum(&bad),
                0xFE,
                "bit {bit} flip should change the checksum"
            );
        }
    }

    /// With both optional fields present, flipping any single bit in the
    /// content-size or dictionary-id bytes must cause `FrameDescriptor::read`
    /// to reject the header with `BadFrameHeader` when checksum
    /// verification is enabled. (Bits within the flags/block-data bytes are
    /// excluded here: several of those bits are independently validated —
    /// version, reserved, `max_size` — so flipping them can legitimately
    /// surface a more specific structural error before the checksum is even
    /// consulted; that's covered by the dedicated rejection tests above and
    /// by `flips_any_bit_breaks_checksum`.)
    #[test]
    fn flipping_any_optional_field_bit_is_caught_with_verification_enabled() {
        let flags = 0b0100_1001u8; // version=1, content.size_present, dictionary.id_present
        let block_data = 0x40u8; // max_size=4
        let content_size = 0x1122_3344_5566_7788u64.to_le_bytes();
        let dictionary_id = 0xAABB_CCDDu32.to_le_bytes();

        let mut checked = Vec::new();
        checked.push(flags);
        checked.push(block_data);
        checked.extend_from_slice(&content_size);
        checked.extend_from_slice(&dictionary_id);
        let checksum = compute_header_checksum(&checked);

        // Sanity check: the unmodified header parses cleanly.
        let mut good_bytes = checked.clone();
        good_bytes.push(checksum);
        FrameDescriptor::read(&mut &good_bytes[..], true).unwrap();

        for bit in 16..(checked.len() * 8) {
            let mut bad = checked.clone();
            bad[bit / 8] ^= 1 << (bit % 8);
            let mut bad_bytes = bad;
            bad_bytes.push(checksum);
            let err = FrameDescriptor::read(&mut &bad_bytes[..], true).unwrap_err();
            assert!(
                matches!(err, Error::BadFrameHeader),
                "bit {bit} flip should have been caught, got {err:?}"
            );
        }
    }
}
