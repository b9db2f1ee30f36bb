//! # pkcodec Deflate
//!
//! DEFLATE (RFC 1951) compression and decompression, plus DEFLATE64
//! decompression, as used by PKZIP methods 8 and 9.
//!
//! ## Features
//!
//! - **Decompression**: stored, fixed and dynamic blocks
//!   - Multi-level Huffman lookup tables ([`huft`])
//!   - DEFLATE64: 64K window, 16-bit extended length, distance codes 30-31
//!   - Fixed tables built on first use and kept until freed
//! - **Compression**: hash-chain LZ77 with per-level tuning
//!   - Greedy (levels 1-3) and lazy (levels 4-9) matching
//!   - Per block choice of stored, static or dynamic coding
//!   - Optional whole-file STORE fallback
//!
//! ## Example
//!
//! ```rust
//! use pkcodec_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//!
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use pkcodec_deflate::{DeflateOptions, Inflater, deflate_stream};
//!
//! let input = b"streamed through a reader and a writer".repeat(10);
//! let mut packed = Vec::new();
//! let summary = deflate_stream(&input[..], &mut packed, DeflateOptions::new(9).unwrap()).unwrap();
//! assert_eq!(summary.bytes_in, input.len() as u64);
//!
//! let mut unpacked = Vec::new();
//! let decoded = Inflater::new().inflate_stream(&packed[..], &mut unpacked).unwrap();
//! assert_eq!(decoded.crc32, summary.crc32);
//! assert_eq!(unpacked, input);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Fast compression
//! - Level 4-6: Balanced (default is 6)
//! - Level 7-9: Best compression (slower)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod huft;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod trees;

// Re-exports
pub use deflate::{DeflateConfig, DeflateOptions, DeflateSummary, Strategy, deflate, deflate_stream};
pub use inflate::{InflateVariant, Inflater, inflate, inflate64};
pub use lz77::Deflater;
pub use trees::FileType;
