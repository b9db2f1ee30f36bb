//! # pkcodec Core
//!
//! Core components shared by the pkcodec engines.
//!
//! - [`bitstream`]: Pull-based input cursor and the encoder's bit writer
//! - [`window`]: Circular output window with flush-on-full
//! - [`crc`]: CRC-32 over decoded and raw data
//! - [`method`]: PKZIP compression method identifiers
//! - [`traits`]: The [`Decoder`] trait and compression levels
//! - [`error`]: Error types and numeric error codes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Archive layer (external)                                │
//! │     central directory, headers, files                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ pkcodec: method dispatch                                │
//! ├─────────────────────────────────────────────────────────┤
//! │ pkcodec-deflate           │ pkcodec-legacy              │
//! │   Inflate(64), Deflate    │   Unshrink, Unreduce        │
//! ├─────────────────────────────────────────────────────────┤
//! │ pkcodec-core (this crate)                               │
//! │     InputCursor, BitWriter, OutputWindow, CRC-32        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use pkcodec_core::bitstream::InputCursor;
//! use pkcodec_core::crc::Crc32;
//!
//! let mut cursor = InputCursor::new(&[0xAB, 0xCD][..]);
//! assert_eq!(cursor.read_bits(12).unwrap(), 0xDAB);
//!
//! assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod method;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitWriter, InputCursor, bi_reverse};
pub use crc::Crc32;
pub use error::{CodecError, ErrorKind, Result};
pub use method::Method;
pub use traits::{CompressionLevel, DecodeSummary, Decoder};
pub use window::{OutputWindow, overlap_copy};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitWriter, InputCursor};
    pub use crate::error::{CodecError, ErrorKind, Result};
    pub use crate::method::Method;
    pub use crate::traits::{CompressionLevel, DecodeSummary, Decoder};
    pub use crate::window::OutputWindow;
}
