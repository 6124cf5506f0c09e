//! Output sink abstraction for the block decoder.
//!
//! The decoder is generic over `Sink` so the same token loop can write either
//! into the frame engine's internal decoded buffer or, on the fast path,
//! directly into a caller-supplied `&mut [u8]`.

#[allow(unused_imports)]
use alloc::vec::Vec;

/// Returns a [`SliceSink`] appropriate for outputting up to `required_capacity`
/// bytes at `vec[offset..offset+required_capacity]`, resizing `vec` as needed.
/// `pos` defines the initial output position in the Sink.
#[inline]
pub(crate) fn vec_sink_for_decompression(
    vec: &mut Vec<u8>,
    offset: usize,
    pos: usize,
    required_capacity: usize,
) -> SliceSink<'_> {
    vec.resize(offset + required_capacity, 0);
    SliceSink::new(&mut vec[offset..], pos)
}

pub trait Sink {
    /// Read the byte at `pos`. Used for the offset==1 run-length special case.
    fn byte_at(&self, pos: usize) -> u8;

    /// Current write position.
    fn pos(&self) -> usize;

    /// Total capacity of the sink.
    fn capacity(&self) -> usize;

    /// Extends the Sink with `data`, verbatim.
    fn extend_from_slice(&mut self, data: &[u8]);

    /// Extends the Sink by repeating `byte` `len` times.
    fn extend_with_fill(&mut self, byte: u8, len: usize);

    /// Copies `len` bytes starting from `start` to the end of the Sink,
    /// where the source and destination ranges do not overlap (`start +
    /// len <= pos()`).
    ///
    /// # Panics
    /// Panics if `start > pos()` or if there isn't enough remaining capacity.
    fn extend_from_within(&mut self, start: usize, len: usize);

    /// Copies `num_bytes` bytes starting from `start` to the end of the
    /// Sink byte-by-byte in increasing index order, where the source and
    /// destination ranges may overlap (`start + num_bytes > pos()`). This
    /// produces LZ4's run-length-expansion semantics when `offset <
    /// match_length`.
    ///
    /// # Panics
    /// Panics if `start > pos()` or if there isn't enough remaining capacity.
    fn extend_from_within_overlapping(&mut self, start: usize, num_bytes: usize);
}

/// `SliceSink` writes into a preallocated, possibly partially uninitialized
/// `&mut [u8]`.
///
/// # Invariants
/// Bytes `[..pos()]` are always initialized.
pub struct SliceSink<'a> {
    output: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceSink<'a> {
    /// Creates a `Sink` backed by the given byte slice.
    /// `pos` defines the initial output position in the Sink.
    ///
    /// # Panics
    /// Panics if `pos` is out of bounds.
    #[inline]
    pub fn new(output: &'a mut [u8], pos: usize) -> Self {
        let _ = &mut output[..pos]; // bounds check pos
        SliceSink { output, pos }
    }
}

impl<'a> Sink for SliceSink<'a> {
    #[inline]
    fn byte_at(&self, pos: usize) -> u8 {
        self.output[pos]
    }

    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.output.len()
    }

    #[inline]
    fn extend_from_slice(&mut self, data: &[u8]) {
        self.output[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    #[inline]
    fn extend_with_fill(&mut self, byte: u8, len: usize) {
        self.output[self.pos..self.pos + len].fill(byte);
        self.pos += len;
    }

    #[inline]
    fn extend_from_within(&mut self, start: usize, len: usize) {
        self.output.copy_within(start..start + len, self.pos);
        self.pos += len;
    }

    #[inline]
    fn extend_from_within_overlapping(&mut self, start: usize, num_bytes: usize) {
        // Forward, byte-by-byte: a bulk copy would read bytes that haven't
        // been written yet when offset < num_bytes (the run-length case).
        for i in 0..num_bytes {
            self.output[self.pos + i] = self.output[start + i];
        }
        self.pos += num_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_slice() {
        let mut data = [0u8; 5];
        let sink = SliceSink::new(&mut data, 1);
        assert_eq!(sink.pos(), 1);
        assert_eq!(sink.capacity(), 5);
    }

    #[test]
    fn test_extend_from_within_overlapping() {
        let mut data = [1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut sink = SliceSink::new(&mut data, 4);
        sink.extend_from_within_overlapping(3, 10);
        assert_eq!(sink.pos(), 14);
        assert_eq!(&data, &[1, 2, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4]);
    }

    use proptest::collection::vec as prop_vec;
    use proptest::prelude::*;

    proptest! {
        /// `extend_from_within_overlapping` must match a naive byte-by-byte
        /// reference copy for every legal (prefix length, offset, match
        /// length) combination, including the run-length-expansion case
        /// where `offset < match_length`.
        #[test]
        fn overlapping_copy_matches_naive_reference(
            prefix in prop_vec(any::<u8>(), 1..32),
            offset in 1usize..32,
            match_length in 1usize..64,
        ) {
            let offset = offset.min(prefix.len());
            let mut expected = prefix.clone();
            let start = expected.len() - offset;
            for i in 0..match_length {
                let byte = expected[start + i];
                expected.push(byte);
            }

            let mut buf = prefix.clone();
            buf.resize(prefix.len() + match_length, 0);
            let mut sink = SliceSink::new(&mut buf, prefix.len());
            sink.extend_from_within_overlapping(prefix.len() - offset, match_length);

            prop_assert_eq!(buf, expected);
        }
    }
}
