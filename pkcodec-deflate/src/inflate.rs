//! DEFLATE decompression (inflate).
//!
//! This module implements the DEFLATE decompression algorithm as specified
//! in RFC 1951, plus the DEFLATE64 variant (PKZIP method 9). It supports all
//! three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! Compressed bytes are pulled through an [`InputCursor`] and decoded bytes
//! are pushed through an [`OutputWindow`], which hands each full window to
//! the destination writer.

use crate::huft::{self, HuftKind, HuftTable};
use crate::tables::{
    BL_CODES, BLBITS, BORDER, CPDEXT, CPDEXT64, CPDIST, CPLENS, CPLENS64, CPLEXT, CPLEXT64, DBITS,
    D_CODES, D_CODES_64, FIXED_BD, FIXED_BL, L_CODES, LBITS, fixed_distance_lengths,
    fixed_litlen_lengths,
};
use pkcodec_core::bitstream::InputCursor;
use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::traits::{DecodeSummary, Decoder};
use pkcodec_core::window::{OutputWindow, sizes};
use std::io::{Read, Write};

/// Which member of the DEFLATE family to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InflateVariant {
    /// RFC 1951 DEFLATE (PKZIP method 8).
    #[default]
    Deflate,
    /// Enhanced deflate (PKZIP method 9): 64 KB window, 16-bit extended
    /// length code, two more distance codes.
    Deflate64,
}

impl InflateVariant {
    /// History window size.
    pub fn window_size(self) -> usize {
        match self {
            Self::Deflate => sizes::DEFLATE,
            Self::Deflate64 => sizes::DEFLATE64,
        }
    }

    /// Largest number of distance codes a block may use.
    pub fn distance_codes(self) -> usize {
        match self {
            Self::Deflate => D_CODES,
            Self::Deflate64 => D_CODES_64,
        }
    }

    fn length_tables(self) -> (&'static [u16], &'static [u8]) {
        match self {
            Self::Deflate => (&CPLENS, &CPLEXT),
            Self::Deflate64 => (&CPLENS64, &CPLEXT64),
        }
    }

    fn distance_extra(self) -> &'static [u8] {
        match self {
            Self::Deflate => &CPDEXT,
            Self::Deflate64 => &CPDEXT64,
        }
    }
}

/// Decoding tables for fixed-code blocks, built on first use.
#[derive(Debug)]
struct FixedTables {
    lit: HuftTable,
    bl: u32,
    dist: HuftTable,
    bd: u32,
}

/// DEFLATE decompressor.
///
/// The context holds no per-stream state besides the cached fixed tables,
/// so one `Inflater` can decode any number of streams in turn.
#[derive(Debug, Default)]
pub struct Inflater {
    variant: InflateVariant,
    fixed: Option<FixedTables>,
}

impl Inflater {
    /// Create a DEFLATE decompressor.
    pub fn new() -> Self {
        Self::with_variant(InflateVariant::Deflate)
    }

    /// Create a DEFLATE64 decompressor.
    pub fn deflate64() -> Self {
        Self::with_variant(InflateVariant::Deflate64)
    }

    /// Create a decompressor for `variant`.
    pub fn with_variant(variant: InflateVariant) -> Self {
        Self {
            variant,
            fixed: None,
        }
    }

    /// The variant this decompressor decodes.
    pub fn variant(&self) -> InflateVariant {
        self.variant
    }

    /// Whether the fixed-code tables are currently cached.
    pub fn has_fixed_tables(&self) -> bool {
        self.fixed.is_some()
    }

    /// Release the cached fixed-code tables. They are rebuilt on demand.
    pub fn free_fixed_tables(&mut self) {
        self.fixed = None;
    }

    /// Decompress one complete stream from `input` into `output`.
    ///
    /// Returns after the final block, once every decoded byte has been
    /// written to `output`. Trailing input after the final block is left
    /// unread (up to the refill buffer).
    pub fn inflate_stream<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<DecodeSummary> {
        let mut cursor = InputCursor::new(input);
        let mut window = OutputWindow::new(output, self.variant.window_size())?;

        let mut blocks = 0u64;
        loop {
            let last = self.inflate_block(&mut cursor, &mut window)?;
            blocks += 1;
            if last {
                break;
            }
        }
        window.finish()?;

        log::debug!(
            "inflate: {} blocks, {} bytes in, {} bytes out",
            blocks,
            cursor.bytes_consumed(),
            window.total_out()
        );
        Ok(DecodeSummary {
            bytes_in: cursor.bytes_consumed(),
            bytes_out: window.total_out(),
            crc32: window.crc32(),
        })
    }

    /// Decompress a single block. Returns whether it was the final one.
    fn inflate_block<R: Read, W: Write>(
        &mut self,
        cursor: &mut InputCursor<R>,
        window: &mut OutputWindow<W>,
    ) -> Result<bool> {
        let last = cursor.read_bits(1)? == 1;
        let btype = cursor.read_bits(2)?;
        log::debug!("inflate: block type {} (final: {})", btype, last);

        match btype {
            0 => inflate_stored(cursor, window)?,
            1 => self.inflate_fixed(cursor, window)?,
            2 => self.inflate_dynamic(cursor, window)?,
            _ => {
                log::warn!("inflate: invalid block type {}", btype);
                return Err(CodecError::corrupted(
                    cursor.bytes_consumed(),
                    format!("invalid block type {}", btype),
                ));
            }
        }
        Ok(last)
    }

    /// Decompress a block with fixed Huffman codes.
    fn inflate_fixed<R: Read, W: Write>(
        &mut self,
        cursor: &mut InputCursor<R>,
        window: &mut OutputWindow<W>,
    ) -> Result<()> {
        let fixed = match self.fixed.take() {
            Some(fixed) => fixed,
            None => build_fixed_tables(self.variant)?,
        };
        let result = inflate_codes(cursor, window, &fixed.lit, fixed.bl, &fixed.dist, fixed.bd);
        self.fixed = Some(fixed);
        result
    }

    /// Decompress a block with dynamic Huffman codes.
    fn inflate_dynamic<R: Read, W: Write>(
        &mut self,
        cursor: &mut InputCursor<R>,
        window: &mut OutputWindow<W>,
    ) -> Result<()> {
        let nl = cursor.read_bits(5)? as usize + 257;
        let nd = cursor.read_bits(5)? as usize + 1;
        let nb = cursor.read_bits(4)? as usize + 4;

        if nl > L_CODES || nd > self.variant.distance_codes() {
            log::warn!("inflate: bad table sizes ({} lit/len, {} distance)", nl, nd);
            return Err(CodecError::corrupted(
                cursor.bytes_consumed(),
                format!("bad code counts: {} literal/length, {} distance", nl, nd),
            ));
        }

        // Code length code lengths, in permuted order.
        let mut bit_lengths = [0u8; BL_CODES];
        for &symbol in BORDER.iter().take(nb) {
            bit_lengths[symbol] = cursor.read_bits(3)? as u8;
        }

        let bl_build = huft::build(&bit_lengths, BL_CODES, &[], &[], BLBITS)?;
        if bl_build.bits == 0 || bl_build.status != huft::BuildStatus::Complete {
            log::warn!("inflate: incomplete code-length code");
            return Err(CodecError::incomplete("code length"));
        }

        let lengths = read_code_lengths(cursor, &bl_build.table, bl_build.bits, nl + nd)?;
        drop(bl_build);

        let (cplens, cplext) = self.variant.length_tables();
        let lit = huft::build(&lengths[..nl], 257, cplens, cplext, LBITS)?;
        if lit.bits == 0 || lit.status != huft::BuildStatus::Complete {
            log::warn!("inflate: incomplete literal/length code");
            return Err(CodecError::incomplete("literal/length"));
        }

        let dist = huft::build(&lengths[nl..], 0, &CPDIST, self.variant.distance_extra(), DBITS)?;
        if dist.status != huft::BuildStatus::Complete {
            log::warn!("inflate: incomplete distance code");
            return Err(CodecError::incomplete("distance"));
        }
        if dist.bits == 0 && nl > 257 {
            log::warn!("inflate: length codes without distance codes");
            return Err(CodecError::incomplete("distance"));
        }

        inflate_codes(cursor, window, &lit.table, lit.bits, &dist.table, dist.bits)
    }
}

impl Decoder for Inflater {
    fn decode_stream<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<DecodeSummary> {
        self.inflate_stream(input, output)
    }
}

fn build_fixed_tables(variant: InflateVariant) -> Result<FixedTables> {
    let (cplens, cplext) = variant.length_tables();
    let lit = huft::build(&fixed_litlen_lengths(), 257, cplens, cplext, FIXED_BL)?;
    // DEFLATE's 30 five-bit codes leave the code incomplete; that is expected.
    let dist = huft::build(
        &fixed_distance_lengths(variant.distance_codes()),
        0,
        &CPDIST,
        variant.distance_extra(),
        FIXED_BD,
    )?;
    log::trace!("inflate: built fixed tables for {:?}", variant);
    Ok(FixedTables {
        lit: lit.table,
        bl: lit.bits,
        dist: dist.table,
        bd: dist.bits,
    })
}

/// Decompress a stored (uncompressed) block.
fn inflate_stored<R: Read, W: Write>(
    cursor: &mut InputCursor<R>,
    window: &mut OutputWindow<W>,
) -> Result<()> {
    cursor.align_to_byte();

    let len = cursor.read_bits(16)? as u16;
    let nlen = cursor.read_bits(16)? as u16;
    if len != !nlen {
        log::warn!("inflate: stored length {:#06x} vs complement {:#06x}", len, nlen);
        return Err(CodecError::corrupted(
            cursor.bytes_consumed(),
            format!("LEN/NLEN mismatch: {} vs {}", len, !nlen),
        ));
    }

    // Whole bytes already in the accumulator come first.
    let mut remaining = len as usize;
    while remaining > 0 && cursor.bits_available() >= 8 {
        window.put(cursor.read_bits(8)? as u8)?;
        remaining -= 1;
    }
    while remaining > 0 {
        let chunk = cursor.take_bytes(remaining)?;
        remaining -= chunk.len();
        window.put_slice(chunk)?;
    }
    Ok(())
}

/// Read `count` literal/length and distance code lengths.
fn read_code_lengths<R: Read>(
    cursor: &mut InputCursor<R>,
    table: &HuftTable,
    bits: u32,
    count: usize,
) -> Result<Vec<u8>> {
    let mut lengths = vec![0u8; count];
    let mut i = 0;
    let mut prev = 0u8;

    while i < count {
        let entry = huft::decode(cursor, table, bits)?;
        let (value, repeat) = match entry.kind {
            HuftKind::Symbol(len @ 0..=15) => {
                prev = len as u8;
                (prev, 1)
            }
            // Repeat the previous length 3-6 times (zero at the start).
            HuftKind::Symbol(16) => (prev, cursor.read_bits(2)? as usize + 3),
            HuftKind::Symbol(17) => {
                prev = 0;
                (0, cursor.read_bits(3)? as usize + 3)
            }
            HuftKind::Symbol(18) => {
                prev = 0;
                (0, cursor.read_bits(7)? as usize + 11)
            }
            _ => return Err(CodecError::invalid_huffman(cursor.bit_position())),
        };

        if i + repeat > count {
            log::warn!("inflate: code length repeat overruns {} lengths", count);
            return Err(CodecError::corrupted(
                cursor.bytes_consumed(),
                "code length repeat overruns the table",
            ));
        }
        lengths[i..i + repeat].fill(value);
        i += repeat;
    }

    Ok(lengths)
}

/// Decode literals and matches until end of block.
fn inflate_codes<R: Read, W: Write>(
    cursor: &mut InputCursor<R>,
    window: &mut OutputWindow<W>,
    lit: &HuftTable,
    bl: u32,
    dist: &HuftTable,
    bd: u32,
) -> Result<()> {
    loop {
        let entry = huft::decode(cursor, lit, bl)?;
        match entry.kind {
            HuftKind::Literal(byte) => window.put(byte)?,
            HuftKind::EndOfBlock => return Ok(()),
            HuftKind::Base { base, extra } => {
                let length = base as usize + cursor.read_bits(extra as u32)? as usize;

                let entry = huft::decode(cursor, dist, bd)?;
                let HuftKind::Base { base, extra } = entry.kind else {
                    return Err(CodecError::invalid_huffman(cursor.bit_position()));
                };
                let distance = base as usize + cursor.read_bits(extra as u32)? as usize;

                window.copy_match(distance, length)?;
            }
            _ => return Err(CodecError::invalid_huffman(cursor.bit_position())),
        }
    }
}

/// Decompress DEFLATE data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decode_all(data)
}

/// Decompress DEFLATE64 data.
pub fn inflate64(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::deflate64().decode_all(data)
}
