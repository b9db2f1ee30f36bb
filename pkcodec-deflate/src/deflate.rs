//! DEFLATE compression.
//!
//! This module holds the encoder's public surface: per-level tuning
//! ([`DeflateConfig`]), caller options ([`DeflateOptions`]), the result of a
//! run ([`DeflateSummary`]) and the streaming entry point
//! [`deflate_stream`]. The match finder lives in [`crate::lz77`] and block
//! output in [`crate::trees`].
//!
//! # Levels
//!
//! - Level 0: stored blocks only
//! - Levels 1-3: greedy matching, all strings of short matches hashed
//! - Levels 4-9: lazy matching with one byte of lookahead
//! - Default is 6

use crate::lz77::Deflater;
use crate::trees::FileType;
use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::method::Method;
use pkcodec_core::traits::CompressionLevel;
use std::io::{Read, Write};

/// General-purpose flag bits for a fast (level 1-2) deflate.
pub const FLAG_FAST: u16 = 4;

/// General-purpose flag bits for a maximum (level 8-9) deflate.
pub const FLAG_SLOW: u16 = 2;

/// Match strategy for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No matching, stored blocks.
    Stored,
    /// Take the first match found at each position.
    Greedy,
    /// Defer a match by one byte when the next position does better.
    Lazy,
}

/// Tuning parameters for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Quarter the chain once the previous match is this long.
    pub good_length: u16,
    /// Lazy: skip the search above this length. Greedy: longest match whose
    /// strings are all inserted into the hash table.
    pub max_lazy: u16,
    /// Stop searching once a match is this long.
    pub nice_length: u16,
    /// Hash chain links to follow.
    pub max_chain: u16,
}

impl DeflateConfig {
    const TABLE: [DeflateConfig; 10] = [
        Self::new(0, 0, 0, 0),
        Self::new(4, 4, 8, 4),
        Self::new(4, 5, 16, 8),
        Self::new(4, 6, 32, 32),
        Self::new(4, 4, 16, 16),
        Self::new(8, 16, 32, 32),
        Self::new(8, 16, 128, 128),
        Self::new(8, 32, 128, 256),
        Self::new(32, 128, 258, 1024),
        Self::new(32, 258, 258, 4096),
    ];

    const fn new(good_length: u16, max_lazy: u16, nice_length: u16, max_chain: u16) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
        }
    }

    /// Parameters for `level`; levels above 9 are [`CodecError::BadLevel`].
    pub fn for_level(level: u8) -> Result<Self> {
        Self::TABLE
            .get(level as usize)
            .copied()
            .ok_or(CodecError::BadLevel(level))
    }

    /// Match strategy for `level`.
    pub fn strategy(level: u8) -> Strategy {
        match level {
            0 => Strategy::Stored,
            1..=3 => Strategy::Greedy,
            _ => Strategy::Lazy,
        }
    }

    /// General-purpose flag bits recorded for `level`.
    pub fn flags(level: u8) -> u16 {
        match level {
            1 | 2 => FLAG_FAST,
            8 | 9 => FLAG_SLOW,
            _ => 0,
        }
    }
}

/// Options for one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeflateOptions {
    /// Compression level.
    pub level: CompressionLevel,
    /// Store the whole input instead when it fits one block and deflating
    /// it does not help.
    pub allow_stored_file: bool,
}

impl DeflateOptions {
    /// Options for `level` with the stored-file fallback off.
    pub fn new(level: u8) -> Result<Self> {
        Ok(Self {
            level: CompressionLevel::new(level)?,
            allow_stored_file: false,
        })
    }

    /// Enable or disable the stored-file fallback.
    pub fn with_stored_file(mut self, allow: bool) -> Self {
        self.allow_stored_file = allow;
        self
    }
}

/// Outcome of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateSummary {
    /// [`Method::Deflated`], or [`Method::Stored`] after the stored-file
    /// fallback (the output is then the raw input).
    pub method: Method,
    /// Ascii/binary guess from the first block.
    pub file_type: FileType,
    /// General-purpose flag bits for the level.
    pub flags: u16,
    /// Uncompressed bytes read.
    pub bytes_in: u64,
    /// Compressed bytes written.
    pub compressed_len: u64,
    /// CRC-32 of the uncompressed bytes.
    pub crc32: u32,
}

/// Compress everything `reader` yields into `writer` as one raw DEFLATE
/// stream.
///
/// The reader is pulled in window-sized chunks until it returns 0 bytes;
/// compressed output is pushed to the writer as the staging buffer fills.
/// An error from either aborts the run.
pub fn deflate_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    options: DeflateOptions,
) -> Result<DeflateSummary> {
    Deflater::new(reader, writer, options)?.run()
}

/// Compress data using DEFLATE.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let options = DeflateOptions::new(level)?;
    let mut output = Vec::new();
    deflate_stream(data, &mut output, options)?;
    Ok(output)
}
