//! Multi-level Huffman decoding tables.
//!
//! [`build`] turns a list of code lengths into a lookup table whose first
//! level is indexed by the next `bits` input bits. Codes longer than the
//! first level continue in sub-tables; every level lives in one flat arena
//! ([`HuftTable`]) and links between levels are arena indices, so a table is
//! released in one piece when it is dropped.
//!
//! Incomplete code sets are padded with dummy codes that decode to
//! [`HuftKind::Invalid`], which the decoder reports as an invalid code.

use crate::tables::{END_OF_BLOCK, INVALID_EXTRA};
use pkcodec_core::bitstream::InputCursor;
use pkcodec_core::error::{CodecError, Result};
use std::io::Read;

/// Longest code length the builder accepts.
pub const BMAX: usize = 16;

/// What a table entry resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuftKind {
    /// A literal byte.
    Literal(u8),
    /// A symbol of an alphabet without literals (code lengths).
    Symbol(u16),
    /// End of block.
    EndOfBlock,
    /// A length or distance: base value plus `extra` extra bits.
    Base {
        /// Base value.
        base: u16,
        /// Extra bits that follow the code.
        extra: u8,
    },
    /// Continue in the sub-table at `index`, which is `bits` wide.
    Table {
        /// Arena index of the sub-table.
        index: u32,
        /// Width of the sub-table.
        bits: u8,
    },
    /// Unused code.
    Invalid,
}

/// One table slot: the bits consumed at this level and what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuftEntry {
    /// Bits consumed by this entry.
    pub bits: u8,
    /// Meaning of the entry.
    pub kind: HuftKind,
}

impl HuftEntry {
    const INVALID: Self = Self {
        bits: 0,
        kind: HuftKind::Invalid,
    };
}

/// Arena holding every level of one decoding table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuftTable {
    entries: Vec<HuftEntry>,
}

impl HuftTable {
    /// Whether the table has no entries (all code lengths were zero).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries across all levels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Release every level. Safe to call repeatedly.
    pub fn free(&mut self) {
        self.entries = Vec::new();
    }
}

/// Completeness of a successfully built code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// Every code is used (or the code is a single 1-bit code).
    Complete,
    /// Unused codes remain; they decode as invalid.
    Incomplete,
}

impl BuildStatus {
    /// Numeric status: 0 complete, 1 incomplete.
    pub fn code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Incomplete => 1,
        }
    }
}

/// Result of [`build`].
#[derive(Debug, Clone)]
pub struct HuftBuild {
    /// The table arena.
    pub table: HuftTable,
    /// Width of the first level.
    pub bits: u32,
    /// Whether the code is complete.
    pub status: BuildStatus,
}

/// Build a decoding table from code lengths.
///
/// Symbols below `num_simple` decode to themselves: for an alphabet with
/// more than 256 simple symbols these are literals and end-of-block,
/// otherwise plain [`HuftKind::Symbol`]s. Symbol `s >= num_simple` decodes
/// to `base_values[s - num_simple]` with `extra_bits[s - num_simple]` extra
/// bits; an extra-bits value of 99 marks the symbol invalid.
///
/// `max_table_bits` bounds the first level; it is narrowed to the range of
/// lengths actually present, and for literal/length alphabets the first level
/// never extends past the end-of-block code's length.
///
/// # Errors
///
/// - [`CodecError::OversubscribedCode`] if the lengths describe more codes
///   than fit.
/// - [`CodecError::CorruptedData`] for a length above 16.
/// - [`CodecError::OutOfMemory`] if the arena cannot grow.
pub fn build(
    lengths: &[u8],
    num_simple: usize,
    base_values: &[u16],
    extra_bits: &[u8],
    max_table_bits: u32,
) -> Result<HuftBuild> {
    let n = lengths.len();

    // Codes per length.
    let mut count = [0u32; BMAX + 1];
    for &len in lengths {
        if len as usize > BMAX {
            return Err(CodecError::corrupted(
                0,
                format!("code length {} exceeds {}", len, BMAX),
            ));
        }
        count[len as usize] += 1;
    }

    if count[0] as usize == n {
        log::trace!("huft: all {} lengths zero, empty table", n);
        return Ok(HuftBuild {
            table: HuftTable::default(),
            bits: 0,
            status: BuildStatus::Complete,
        });
    }

    let min_len = (1..=BMAX).find(|&j| count[j] != 0).unwrap_or(1) as u32;
    let max_len = (1..=BMAX).rev().find(|&j| count[j] != 0).unwrap_or(BMAX) as u32;
    let mut m = max_table_bits;
    if m < min_len {
        m = min_len;
    }
    if m > max_len {
        m = max_len;
    }

    // Check the Kraft sum, padding the longest length with dummy codes.
    let mut room: i64 = 1 << min_len;
    for len in min_len..max_len {
        room -= count[len as usize] as i64;
        if room < 0 {
            log::warn!("huft: over-subscribed code lengths");
            return Err(CodecError::OversubscribedCode);
        }
        room <<= 1;
    }
    room -= count[max_len as usize] as i64;
    if room < 0 {
        log::warn!("huft: over-subscribed code lengths");
        return Err(CodecError::OversubscribedCode);
    }
    count[max_len as usize] += room as u32;

    // Symbols sorted by code length.
    let mut offsets = [0usize; BMAX + 2];
    for len in 1..max_len as usize {
        offsets[len + 1] = offsets[len] + count[len] as usize;
    }
    let real_codes = lengths.iter().filter(|&&len| len != 0).count();
    let mut sorted: Vec<u16> = Vec::new();
    sorted.try_reserve_exact(real_codes)?;
    sorted.resize(real_codes, 0);
    for (symbol, &len) in lengths.iter().enumerate() {
        if len != 0 {
            sorted[offsets[len as usize]] = symbol as u16;
            offsets[len as usize] += 1;
        }
    }

    let eob_len = if n > END_OF_BLOCK as usize {
        lengths[END_OF_BLOCK as usize] as u32
    } else {
        BMAX as u32
    };
    let literals = num_simple > END_OF_BLOCK as usize;

    let mut arena: Vec<HuftEntry> = Vec::new();
    // Per open level (indexed by depth, 1 = first level): arena start, width
    // and the code prefix that selected it. Depth 0 is a zero-width sentinel.
    let mut start = [0usize; BMAX + 2];
    let mut width = [0u32; BMAX + 2];
    let mut prefix = [0u32; BMAX + 2];
    let mut depth = 0usize;
    // Bits decoded by the levels above the current one.
    let mut w = 0u32;
    // Current code, bit-reversed.
    let mut code = 0u32;
    let mut next = 0usize;

    for k in min_len..=max_len {
        let mut left = count[k as usize];
        while left > 0 {
            left -= 1;

            // Open levels until a code of length k fits.
            while k > w + width[depth] {
                w += width[depth];
                depth += 1;

                let limit = (max_len - w).min(m);
                let mut j = k - w;
                let mut f = 1u32 << j;
                if f > left + 1 {
                    // Grow the table while the codes of the next lengths fill it.
                    f -= left + 1;
                    let mut len = k as usize;
                    loop {
                        j += 1;
                        if j >= limit {
                            break;
                        }
                        f <<= 1;
                        len += 1;
                        if f <= count[len] {
                            break;
                        }
                        f -= count[len];
                    }
                }
                if w + j > eob_len && w < eob_len {
                    j = eob_len - w;
                }

                let size = 1usize << j;
                let base = arena.len();
                arena.try_reserve(size)?;
                arena.resize(base + size, HuftEntry::INVALID);
                start[depth] = base;
                width[depth] = j;

                if depth > 1 {
                    prefix[depth] = code;
                    let parent_bits = width[depth - 1];
                    let slot = ((code & ((1 << w) - 1)) >> (w - parent_bits)) as usize;
                    arena[start[depth - 1] + slot] = HuftEntry {
                        bits: parent_bits as u8,
                        kind: HuftKind::Table {
                            index: base as u32,
                            bits: j as u8,
                        },
                    };
                }
            }

            let kind = if next >= sorted.len() {
                HuftKind::Invalid
            } else {
                let symbol = sorted[next] as usize;
                next += 1;
                if symbol < num_simple {
                    match symbol {
                        0..=255 if literals => HuftKind::Literal(symbol as u8),
                        256 if literals => HuftKind::EndOfBlock,
                        _ => HuftKind::Symbol(symbol as u16),
                    }
                } else {
                    let index = symbol - num_simple;
                    match (base_values.get(index), extra_bits.get(index)) {
                        (Some(_), Some(&INVALID_EXTRA)) | (None, _) | (_, None) => {
                            HuftKind::Invalid
                        }
                        (Some(&base), Some(&extra)) => HuftKind::Base { base, extra },
                    }
                }
            };
            let entry = HuftEntry {
                bits: (k - w) as u8,
                kind,
            };

            // Replicate the entry over every index sharing the code's low bits.
            let step = 1usize << (k - w);
            let size = 1usize << width[depth];
            let mut slot = (code >> w) as usize;
            while slot < size {
                arena[start[depth] + slot] = entry;
                slot += step;
            }

            // Backwards increment of the k-bit code.
            let mut bit = 1u32 << (k - 1);
            while code & bit != 0 {
                code ^= bit;
                bit >>= 1;
            }
            code ^= bit;

            // Close levels whose codes are exhausted.
            while (code & ((1u32 << w) - 1)) != prefix[depth] {
                depth -= 1;
                w -= width[depth];
            }
        }
    }

    let status = if room != 0 && max_len != 1 {
        BuildStatus::Incomplete
    } else {
        BuildStatus::Complete
    };
    log::trace!(
        "huft: {} codes, lengths {}..={}, first level {} bits, {} entries, {:?}",
        real_codes,
        min_len,
        max_len,
        width[1],
        arena.len(),
        status
    );

    Ok(HuftBuild {
        table: HuftTable { entries: arena },
        bits: width[1],
        status,
    })
}

/// Decode one symbol, consuming its bits.
///
/// `bits` is the first-level width returned by [`build`]. An unused code,
/// or any lookup in an empty table, is an invalid-code error.
pub fn decode<R: Read>(
    cursor: &mut InputCursor<R>,
    table: &HuftTable,
    bits: u32,
) -> Result<HuftEntry> {
    if table.is_empty() {
        return Err(CodecError::invalid_huffman(cursor.bit_position()));
    }

    cursor.fill(bits)?;
    let mut entry = table.entries[cursor.peek(bits) as usize];
    loop {
        match entry.kind {
            HuftKind::Table { index, bits: sub } => {
                cursor.dump(entry.bits as u32)?;
                cursor.fill(sub as u32)?;
                entry = table.entries[index as usize + cursor.peek(sub as u32) as usize];
            }
            HuftKind::Invalid => {
                return Err(CodecError::invalid_huffman(cursor.bit_position()));
            }
            _ => {
                cursor.dump(entry.bits as u32)?;
                return Ok(entry);
            }
        }
    }
}
