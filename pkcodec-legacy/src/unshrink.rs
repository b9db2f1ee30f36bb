//! Unshrink: PKZIP method 1 decompression.
//!
//! Shrink is LZW with codes growing from 9 to 13 bits, packed LSB first.
//! Code 256 escapes a control subcode read at the current width:
//!
//! - 1: grow the code width by one bit
//! - 2: partially clear the code table (free all leaf codes)
//!
//! Other subcodes are ignored. There is no end code; the stream ends when
//! the input runs out or the expected size has been produced.

use crate::dictionary::{ESCAPE, ShrinkDictionary};
use pkcodec_core::bitstream::InputCursor;
use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::traits::{DecodeSummary, Decoder};
use pkcodec_core::window::{OutputWindow, sizes};
use std::io::{Read, Write};

/// Initial code width.
pub const MIN_CODE_BITS: u32 = 9;

/// Largest code width.
pub const MAX_CODE_BITS: u32 = 13;

const SUBCODE_GROW: u16 = 1;
const SUBCODE_CLEAR: u16 = 2;

/// Unshrink decoder.
#[derive(Debug, Clone, Default)]
pub struct Unshrinker {
    /// Stop after this many bytes of output.
    expected_size: Option<u64>,
}

impl Unshrinker {
    /// Create a decoder that runs until the input is exhausted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that stops after `size` bytes of output.
    pub fn with_expected_size(size: u64) -> Self {
        Self {
            expected_size: Some(size),
        }
    }

    /// Decompress one Shrink stream from `input` into `output`.
    pub fn unshrink_stream<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<DecodeSummary> {
        let mut cursor = InputCursor::new(input);
        let mut window = OutputWindow::new(output, sizes::SHRINK)?;
        let limit = self.expected_size.unwrap_or(u64::MAX);

        if limit > 0 {
            decode_codes(&mut cursor, &mut window, limit)?;
        }
        window.finish()?;

        Ok(DecodeSummary {
            bytes_in: cursor.bytes_consumed(),
            bytes_out: window.total_out(),
            crc32: window.crc32(),
        })
    }
}

impl Decoder for Unshrinker {
    fn decode_stream<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<DecodeSummary> {
        self.unshrink_stream(input, output)
    }
}

/// Next code of `bits` bits, or `None` when fewer bits remain.
fn read_code<R: Read>(cursor: &mut InputCursor<R>, bits: u32) -> Result<Option<u16>> {
    if !cursor.fill(bits)? {
        return Ok(None);
    }
    Ok(Some(cursor.read_bits(bits)? as u16))
}

fn decode_codes<R: Read, W: Write>(
    cursor: &mut InputCursor<R>,
    window: &mut OutputWindow<W>,
    limit: u64,
) -> Result<()> {
    let mut dict = ShrinkDictionary::new()?;
    let mut code_bits = MIN_CODE_BITS;
    let mut table_full = false;

    let Some(first) = read_code(cursor, code_bits)? else {
        return Ok(());
    };
    if first >= ESCAPE {
        log::warn!("unshrink: stream starts with code {}", first);
        return Err(CodecError::corrupted(
            cursor.bytes_consumed(),
            "first Shrink code is not a literal",
        ));
    }
    window.put(first as u8)?;
    let mut prev = first;

    while window.total_out() < limit {
        let Some(code) = read_code(cursor, code_bits)? else {
            break;
        };

        if code == ESCAPE {
            let Some(subcode) = read_code(cursor, code_bits)? else {
                break;
            };
            match subcode {
                SUBCODE_GROW => {
                    code_bits += 1;
                    if code_bits > MAX_CODE_BITS {
                        log::warn!("unshrink: code width grows past {} bits", MAX_CODE_BITS);
                        return Err(CodecError::corrupted(
                            cursor.bytes_consumed(),
                            "Shrink code width above 13 bits",
                        ));
                    }
                    log::debug!("unshrink: code width now {} bits", code_bits);
                }
                SUBCODE_CLEAR => {
                    dict.partial_clear();
                    table_full = false;
                }
                other => log::trace!("unshrink: ignoring escape subcode {}", other),
            }
            continue;
        }

        let Some(string) = dict.expand(code, prev) else {
            return Err(CodecError::corrupted(
                cursor.bytes_consumed(),
                "cyclic Shrink code table",
            ));
        };
        let first_byte = string[0];
        let room = (limit - window.total_out()).min(string.len() as u64) as usize;
        window.put_slice(&string[..room])?;

        if dict.add_leaf(prev, first_byte).is_none() && !table_full {
            log::debug!("unshrink: code table full");
            table_full = true;
        }
        prev = code;
    }
    Ok(())
}
