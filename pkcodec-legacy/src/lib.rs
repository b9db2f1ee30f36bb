//! # pkcodec Legacy
//!
//! Decompressors for the pre-DEFLATE PKZIP methods:
//!
//! - **Unshrink** (method 1): LZW with 9-13 bit codes and partial clearing
//! - **Unreduce** (methods 2-5): follower-set probabilistic coding followed
//!   by a DLE-escaped LZ77 expansion, with factors 1-4
//!
//! Neither format has an end marker. Shrink streams end with their input
//! (or at an expected size); Reduce streams always need the uncompressed
//! size from the archive entry.
//!
//! ## Example
//!
//! ```rust
//! use pkcodec_core::bitstream::BitWriter;
//! use pkcodec_legacy::unshrink;
//!
//! // Codes 'A', 'B', then 257 ("AB"), nine bits each.
//! let mut writer = BitWriter::new(Vec::new());
//! for code in [65, 66, 257] {
//!     writer.send_bits(code, 9).unwrap();
//! }
//! writer.finish().unwrap();
//!
//! let output = unshrink(&writer.into_inner()).unwrap();
//! assert_eq!(output, b"ABAB");
//! ```
//!
//! ## Reduce
//!
//! ```rust
//! use pkcodec_core::bitstream::BitWriter;
//! use pkcodec_legacy::{ReduceFactor, unreduce};
//!
//! // Empty follower sets, then raw bytes: "abc", DLE, 3, 2.
//! let mut writer = BitWriter::new(Vec::new());
//! for _ in 0..256 {
//!     writer.send_bits(0, 6).unwrap();
//! }
//! for byte in [b'a', b'b', b'c', 0x90, 3, 2] {
//!     writer.send_bits(byte as u32, 8).unwrap();
//! }
//! writer.finish().unwrap();
//!
//! let output = unreduce(&writer.into_inner(), ReduceFactor::ONE, 9).unwrap();
//! assert_eq!(output, b"abcabcabc");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dictionary;
pub mod unreduce;
pub mod unshrink;

pub use config::ReduceFactor;
pub use dictionary::ShrinkDictionary;
pub use unreduce::Unreducer;
pub use unshrink::Unshrinker;

use pkcodec_core::error::Result;
use pkcodec_core::traits::Decoder;

/// Decompress a complete Shrink stream.
///
/// Decoding stops when fewer bits than the current code width remain.
pub fn unshrink(data: &[u8]) -> Result<Vec<u8>> {
    Unshrinker::new().decode_all(data)
}

/// Decompress a complete Reduce stream of `uncompressed_size` bytes.
pub fn unreduce(data: &[u8], factor: ReduceFactor, uncompressed_size: u64) -> Result<Vec<u8>> {
    Unreducer::new(factor, uncompressed_size).decode_all(data)
}
