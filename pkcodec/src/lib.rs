//! # pkcodec
//!
//! Pure Rust compression engines for PKZIP entries.
//!
//! This crate ties the engines together behind one dispatch point for an
//! archive layer that has already parsed the local header:
//!
//! - **Stored** (method 0): verbatim copy with CRC-32
//! - **Shrunk** (method 1): Unshrink
//! - **Reduced** (methods 2-5): Unreduce, factors 1-4
//! - **Deflated** (method 8): Inflate, plus the DEFLATE encoder
//! - **Deflate64** (method 9): Inflate with the 64K window
//!
//! Implode (method 6) and newer methods are reported as unsupported.
//!
//! ## Example
//!
//! ```rust
//! use pkcodec::{DeflateOptions, Method, compress, decompress};
//!
//! let original = b"PKZIP entries, one method at a time. ".repeat(8);
//!
//! let mut packed = Vec::new();
//! let written = compress(&original[..], &mut packed, DeflateOptions::new(9).unwrap()).unwrap();
//! assert_eq!(written.method, Method::Deflated);
//!
//! let mut unpacked = Vec::new();
//! let read = decompress(written.method, &packed[..], &mut unpacked, written.bytes_in).unwrap();
//! assert_eq!(read.crc32, written.crc32);
//! assert_eq!(unpacked, original);
//! ```
//!
//! ## Crates
//!
//! - [`pkcodec_core`]: errors, bit I/O, output window, CRC-32
//! - [`pkcodec_deflate`]: Inflate, Inflate64 and Deflate
//! - [`pkcodec_legacy`]: Unshrink and Unreduce

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod dispatch;

pub use dispatch::{compress, decompress, decompress_to_vec, is_supported};

// Re-exports
pub use pkcodec_core::{
    CodecError, CompressionLevel, DecodeSummary, Decoder, ErrorKind, Method, Result,
};
pub use pkcodec_deflate::{DeflateOptions, DeflateSummary, FileType, InflateVariant, Inflater};
pub use pkcodec_legacy::{ReduceFactor, Unreducer, Unshrinker};

pub use pkcodec_core;
pub use pkcodec_deflate;
pub use pkcodec_legacy;
