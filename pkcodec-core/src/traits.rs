//! Core traits shared by the decoders, and the compression level type.

use crate::error::{CodecError, Result};
use std::io::{Read, Write};

/// Outcome of a completed decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeSummary {
    /// Compressed bytes consumed.
    pub bytes_in: u64,
    /// Decoded bytes written.
    pub bytes_out: u64,
    /// CRC-32 of the decoded bytes.
    pub crc32: u32,
}

/// A streaming decoder.
///
/// Implemented by Inflate, Unshrink and Unreduce. The decoder pulls
/// compressed bytes from `input` as it needs them and pushes decoded bytes
/// to `output` each time its window fills. Returning an error from either
/// side aborts the stream.
pub trait Decoder {
    /// Decode one complete stream from `input` into `output`.
    fn decode_stream<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<DecodeSummary>;

    /// Decode an in-memory stream (convenience method).
    fn decode_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decode_stream(input, &mut output)?;
        Ok(output)
    }
}

/// Compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (stored blocks).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a compression level, rejecting values above 9.
    pub fn new(level: u8) -> Result<Self> {
        if level > 9 {
            return Err(CodecError::BadLevel(level));
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = CodecError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::FAST.level(), 1);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::BEST.level(), 9);
        assert_eq!(CompressionLevel::default(), CompressionLevel::DEFAULT);
    }

    #[test]
    fn test_bad_level() {
        let err = CompressionLevel::new(10).unwrap_err();
        assert!(matches!(err, CodecError::BadLevel(10)));
        assert_eq!(err.code(), 6);
        assert!(CompressionLevel::try_from(9).is_ok());
    }
}
