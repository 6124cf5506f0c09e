/*! Pure Rust implementation of an LZ4 frame decompressor.

This crate decodes the LZ4 Frame container format — General, Legacy and
Skippable frames — into the original uncompressed byte stream. It does not
implement the encode (compression) path, nor dictionary-assisted decoding;
see the [`frame`] module docs for the exact scope.

# Examples
```
use lz4_destream::block::decompress;

// token 0x30: literal_length=3, match_length=0 (no match follows, trailing literals)
let block = [0x30, b'a', b'4', b'9'];
let out = decompress(&block, 3).unwrap();
assert_eq!(out, b"a49");
```

```no_run
use std::io::Read;

let compressed = std::fs::read("datafile.lz4").unwrap();
let mut decoder = lz4_destream::frame::Decompressor::new(&compressed[..]);
let mut out = Vec::new();
decoder.read_to_end(&mut out).unwrap();
```

# Feature Flags
- `std` (default): enables the [`frame`] module (the streaming frame
  decompressor), which needs `std::io::Read` and the `twox-hash` dependency
  for header checksum verification. Without it, only the `alloc`-based
  [`block`] decoder is compiled.
- `checked-decode` (default): adds bounds checks that reject malformed
  blocks with an error instead of reading/writing out of bounds. Only
  disable this on input you fully trust.
*/
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod block;
#[cfg(feature = "std")]
pub mod frame;

#[cfg(feature = "std")]
pub use frame::Decompressor;
