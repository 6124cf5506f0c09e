use std::io::{self, Read};
use std::fmt;

use super::header::{self, BlockHeader, FrameDescriptor, MagicKind};
use super::Error;
use crate::sink::SliceSink;

const LEGACY_BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// Configuration accepted by [`Decompressor::with_options`].
#[derive(Clone, Copy, Debug)]
pub struct DecompressorOptions {
    /// Verify the frame header checksum against the computed XXH32 value.
    /// Block and content checksums are always parsed and skipped but never
    /// verified, regardless of this setting.
    pub verify_checksums: bool,
}

impl Default for DecompressorOptions {
    fn default() -> Self {
        DecompressorOptions {
            verify_checksums: true,
        }
    }
}

enum FrameState {
    General(FrameDescriptor),
    Legacy,
}

/// A reader that decompresses the LZ4 frame format as it's read.
///
/// Wraps any other reader implementing `io::Read`. Bytes read from a
/// `Decompressor` are the decompressed contents of the General, Legacy, and
/// Skippable frames found in the underlying stream; skippable frames are
/// consumed transparently and frames may be concatenated.
///
/// # Example
/// ```no_run
/// use std::io::Read;
///
/// let compressed = std::fs::read("datafile.lz4").unwrap();
/// let mut decoder = lz4_destream::frame::Decompressor::new(&compressed[..]);
/// let mut out = Vec::new();
/// decoder.read_to_end(&mut out).unwrap();
/// ```
pub struct Decompressor<R> {
    r: R,
    options: DecompressorOptions,
    frame: Option<FrameState>,
    /// A magic number already consumed from `r` while probing a legacy
    /// block's length field, to be dispatched on the next `start_frame`
    /// call instead of being read again.
    pending_magic: Option<u32>,
    done: bool,
    src: Vec<u8>,
    dst: Vec<u8>,
    dst_start: usize,
    dst_end: usize,
}

impl<R: Read> Decompressor<R> {
    /// Creates a new `Decompressor` wrapping `source`, verifying frame
    /// header checksums.
    pub fn new(source: R) -> Decompressor<R> {
        Self::with_options(source, DecompressorOptions::default())
    }

    /// Creates a new `Decompressor` with the given options.
    pub fn with_options(source: R, options: DecompressorOptions) -> Decompressor<R> {
        Decompressor {
            r: source,
            options,
            frame: None,
            pending_magic: None,
            done: false,
            src: Vec::new(),
            dst: Vec::new(),
            dst_start: 0,
            dst_end: 0,
        }
    }

    /// The descriptor of the frame currently being decoded, or `None`
    /// outside a frame or inside a Legacy frame (which has no descriptor).
    pub fn frame_info(&self) -> Option<&FrameDescriptor> {
        match &self.frame {
            Some(FrameState::General(fd)) => Some(fd),
            _ => None,
        }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.r
    }

    /// Gets a mutable reference to the underlying reader.
    ///
    /// Mutating the stream out from under the decompressor may produce
    /// surprising results if reading continues afterwards.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.r
    }

    /// Unwraps this `Decompressor`, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.r
    }

    fn current_max_block_size(&self) -> usize {
        match &self.frame {
            Some(FrameState::General(fd)) => fd.block_size.get_size(),
            Some(FrameState::Legacy) => LEGACY_BLOCK_SIZE,
            None => 0,
        }
    }

    /// Reads a 4-byte little-endian word, distinguishing a clean EOF
    /// (0 bytes available) from a truncated magic number (1-3 bytes then
    /// EOF, reported as `Error::EndOfStream` like any other mid-frame
    /// truncation).
    fn try_read_u32(&mut self) -> Result<Option<u32>, Error> {
        let mut buf = [0u8; 4];
        let n = self.r.read(&mut buf[..1])?;
        if n == 0 {
            return Ok(None);
        }
        read_exact_or_eof(&mut self.r, &mut buf[1..])?;
        Ok(Some(u32::from_le_bytes(buf)))
    }

    /// Begins the next frame, transparently skipping any Skippable frames
    /// encountered first. Returns `Ok(false)` at a clean end of stream.
    fn start_frame(&mut self) -> Result<bool, Error> {
        loop {
            let word = match self.pending_magic.take() {
                Some(w) => w,
                None => match self.try_read_u32()? {
                    Some(w) => w,
                    None => {
                        self.done = true;
                        return Ok(false);
                    }
                },
            };

            match header::classify_magic(word)? {
                MagicKind::Skippable => {
                    let len = header::read_u32(&mut self.r)?;
                    header::skip_bytes(&mut self.r, len as u64)?;
                    continue;
                }
                MagicKind::General => {
                    let descriptor = FrameDescriptor::read(&mut self.r, self.options.verify_checksums)?;
                    let max_block_size = descriptor.block_size.get_size();
                    self.src.clear();
                    self.dst.clear();
                    self.dst_start = 0;
                    self.dst_end = 0;
                    self.src.reserve_exact(max_block_size);
                    self.frame = Some(FrameState::General(descriptor));
                    return Ok(true);
                }
                MagicKind::Legacy => {
                    self.src.clear();
                    self.dst.clear();
                    self.dst_start = 0;
                    self.dst_end = 0;
                    self.src.reserve_exact(LEGACY_BLOCK_SIZE);
                    self.frame = Some(FrameState::Legacy);
                    return Ok(true);
                }
            }
        }
    }

    /// Loads and decodes the next block of the current frame into `self.dst`.
    /// Returns the number of decoded bytes, or `0` once the frame has ended
    /// (in which case `self.frame` is reset to `None`).
    fn read_block(&mut self) -> Result<usize, Error> {
        debug_assert_eq!(self.dst_start, self.dst_end);
        self.dst_start = 0;
        self.dst_end = 0;
        match self.frame.as_ref().expect("read_block called outside a frame") {
            FrameState::General(_) => self.read_general_block(),
            FrameState::Legacy => self.read_legacy_block(),
        }
    }

    fn read_general_block(&mut self) -> Result<usize, Error> {
        let (max_block_size, block_checksums, content_checksum) = match self.frame.as_ref().unwrap()
        {
            FrameState::General(fd) => (fd.block_size.get_size(), fd.block_checksums, fd.content_checksum),
            FrameState::Legacy => unreachable!(),
        };

        match BlockHeader::read(&mut self.r)? {
            BlockHeader::EndMark => {
                if content_checksum {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                self.frame = None;
                Ok(0)
            }
            BlockHeader::Uncompressed(len) => {
                let len = len as usize;
                if len > max_block_size {
                    return Err(Error::BlockTooBig);
                }
                ensure_capacity(&mut self.dst, len);
                read_exact_or_eof(&mut self.r, &mut self.dst[..len])?;
                if block_checksums {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                self.dst_end = len;
                Ok(len)
            }
            BlockHeader::Compressed(len) => {
                let len = len as usize;
                if len > max_block_size {
                    return Err(Error::BlockTooBig);
                }
                ensure_capacity(&mut self.src, len);
                read_exact_or_eof(&mut self.r, &mut self.src[..len])?;
                if block_checksums {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                ensure_capacity(&mut self.dst, max_block_size);
                let decoded =
                    crate::block::decompress::decompress_internal(&self.src[..len], &mut SliceSink::new(&mut self.dst, 0))
                        .map_err(Error::DecompressionError)?;
                self.dst_end = decoded;
                Ok(decoded)
            }
        }
    }

    /// Legacy frames have no end-of-frame marker; termination is signalled
    /// either by a clean EOF, or by the next 4 bytes being a magic number
    /// recognised as the start of another frame (General, Legacy, or
    /// Skippable) rather than a block-length field. The latter is how two
    /// legacy frames concatenated back-to-back are told apart.
    fn read_legacy_block(&mut self) -> Result<usize, Error> {
        let word = match self.try_read_u32()? {
            Some(w) => w,
            None => {
                self.frame = None;
                return Ok(0);
            }
        };

        if header::classify_magic(word).is_ok() {
            self.pending_magic = Some(word);
            self.frame = None;
            return Ok(0);
        }

        let len = word as usize;
        if len > LEGACY_BLOCK_SIZE {
            return Err(Error::BlockTooBig);
        }
        ensure_capacity(&mut self.src, len);
        read_exact_or_eof(&mut self.r, &mut self.src[..len])?;
        ensure_capacity(&mut self.dst, LEGACY_BLOCK_SIZE);
        let decoded =
            crate::block::decompress::decompress_internal(&self.src[..len], &mut SliceSink::new(&mut self.dst, 0))
                .map_err(Error::DecompressionError)?;
        self.dst_end = decoded;
        Ok(decoded)
    }

    /// Fast path: decode a single compressed General-frame block directly
    /// into the caller's buffer, bypassing `self.dst` entirely. Only taken
    /// when `out.len()` is at least the frame's max block size, so the
    /// decoded block is guaranteed to fit.
    fn read_block_fast(&mut self, out: &mut [u8]) -> Result<Option<usize>, Error> {
        let (max_block_size, block_checksums, content_checksum) = match self.frame.as_ref().unwrap()
        {
            FrameState::General(fd) => (fd.block_size.get_size(), fd.block_checksums, fd.content_checksum),
            FrameState::Legacy => unreachable!("fast path is only taken for General frames"),
        };
        debug_assert!(out.len() >= max_block_size);

        match BlockHeader::read(&mut self.r)? {
            BlockHeader::EndMark => {
                if content_checksum {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                self.frame = None;
                Ok(None)
            }
            BlockHeader::Uncompressed(len) => {
                let len = len as usize;
                if len > max_block_size {
                    return Err(Error::BlockTooBig);
                }
                read_exact_or_eof(&mut self.r, &mut out[..len])?;
                if block_checksums {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                Ok(Some(len))
            }
            BlockHeader::Compressed(len) => {
                let len = len as usize;
                if len > max_block_size {
                    return Err(Error::BlockTooBig);
                }
                ensure_capacity(&mut self.src, len);
                read_exact_or_eof(&mut self.r, &mut self.src[..len])?;
                if block_checksums {
                    header::skip_bytes(&mut self.r, 4)?;
                }
                let decoded = crate::block::decompress::decompress_internal(
                    &self.src[..len],
                    &mut SliceSink::new(out, 0),
                )
                .map_err(Error::DecompressionError)?;
                Ok(Some(decoded))
            }
        }
    }
}

/// Reads exactly `buf.len()` bytes, mapping a clean EOF mid-read to
/// [`Error::EndOfStream`] rather than letting it surface as a generic
/// `UnexpectedEof` io error.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), Error> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::EndOfStream
        } else {
            Error::Io(e)
        }
    })
}

/// Grows `v` to at least `len` bytes if it isn't already that large.
fn ensure_capacity(v: &mut Vec<u8>, len: usize) {
    if v.len() < len {
        v.resize(len, 0);
    }
}

impl<R: Read> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.dst_start < self.dst_end {
                let n = (self.dst_end - self.dst_start).min(buf.len());
                let end = self.dst_start + n;
                buf[..n].copy_from_slice(&self.dst[self.dst_start..end]);
                self.dst_start = end;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            if self.frame.is_none() && !self.start_frame()? {
                return Ok(0);
            }

            let max_block_size = self.current_max_block_size();
            if buf.len() >= max_block_size
                && matches!(self.frame, Some(FrameState::General(_)))
            {
                match self.read_block_fast(buf)? {
                    Some(0) => continue,
                    Some(n) => return Ok(n),
                    None => continue,
                }
            }

            if self.read_block()? == 0 {
                continue;
            }
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Decompressor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompressor")
            .field("r", &self.r)
            .field("options", &self.options)
            .field("dst_start", &self.dst_start)
            .field("dst_end", &self.dst_end)
            .finish()
    }
}
