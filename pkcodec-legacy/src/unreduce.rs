//! Unreduce: PKZIP methods 2-5 decompression.
//!
//! A Reduce stream starts with 256 follower sets, one per byte value,
//! listed from 255 down to 0: a 6-bit count followed by that many 8-bit
//! bytes. Each symbol is then coded relative to the set of the byte before
//! it:
//!
//! - empty set: 8 raw bits
//! - otherwise one flag bit; 1 means 8 raw bits, 0 means an index into the
//!   set of [`B_TABLE`]`[len]` bits
//!
//! The decoded bytes go through a small state machine. DLE (0x90) starts
//! an escape: a following 0 is a literal DLE, anything else is the first
//! byte `V` of a back-reference whose split depends on the
//! [`ReduceFactor`].

use crate::config::ReduceFactor;
use pkcodec_core::bitstream::InputCursor;
use pkcodec_core::error::Result;
use pkcodec_core::traits::{DecodeSummary, Decoder};
use pkcodec_core::window::{OutputWindow, sizes};
use std::io::{Read, Write};

/// Escape byte.
pub const DLE: u8 = 0x90;

/// Largest follower set a 6-bit count can announce.
const MAX_FOLLOWERS: usize = 64;

/// Bits needed to index a follower set, by set length.
///
/// `B_TABLE[0]` is 8 so an empty set reads a raw byte; otherwise the width
/// is the bit length of `len - 1`, at least 1.
pub const B_TABLE: [u8; 256] = b_table();

const fn b_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    table[0] = 8;
    let mut len = 1;
    while len < 256 {
        let bits = usize::BITS - (len - 1usize).leading_zeros();
        table[len] = if bits == 0 { 1 } else { bits as u8 };
        len += 1;
    }
    table
}

/// Per-byte follower sets.
struct FollowerSets {
    len: [u8; 256],
    sets: Vec<[u8; MAX_FOLLOWERS]>,
}

impl FollowerSets {
    fn load<R: Read>(cursor: &mut InputCursor<R>) -> Result<Self> {
        let mut len = [0u8; 256];
        let mut sets = Vec::new();
        sets.try_reserve_exact(256)?;
        sets.resize(256, [0u8; MAX_FOLLOWERS]);

        for x in (0..256).rev() {
            let count = cursor.read_bits(6)? as usize;
            len[x] = count as u8;
            for follower in sets[x].iter_mut().take(count) {
                *follower = cursor.read_bits(8)? as u8;
            }
        }

        log::trace!(
            "unreduce: {} non-empty follower sets",
            len.iter().filter(|&&n| n != 0).count()
        );
        Ok(Self { len, sets })
    }

    /// Decode the byte that follows `last`.
    #[inline]
    fn next<R: Read>(&self, cursor: &mut InputCursor<R>, last: u8) -> Result<u8> {
        let set_len = self.len[last as usize];
        if set_len == 0 || cursor.read_bits(1)? != 0 {
            return Ok(cursor.read_bits(8)? as u8);
        }
        let index = cursor.read_bits(B_TABLE[set_len as usize] as u32)? as usize;
        Ok(self.sets[last as usize][index])
    }
}

/// Expansion state between decoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Next byte is a literal or DLE.
    Literal,
    /// After DLE.
    Escape,
    /// Length continues in the next byte.
    Length { v: u8, len: usize },
    /// Next byte is the low distance byte.
    Distance { v: u8, len: usize },
}

/// Unreduce decoder.
#[derive(Debug, Clone)]
pub struct Unreducer {
    factor: ReduceFactor,
    uncompressed_size: u64,
}

impl Unreducer {
    /// Create a decoder for `factor` producing `uncompressed_size` bytes.
    ///
    /// Reduce streams carry no end marker, so the size is required.
    pub fn new(factor: ReduceFactor, uncompressed_size: u64) -> Self {
        Self {
            factor,
            uncompressed_size,
        }
    }

    /// The configured factor.
    pub fn factor(&self) -> ReduceFactor {
        self.factor
    }

    /// Decompress one Reduce stream from `input` into `output`.
    pub fn unreduce_stream<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<DecodeSummary> {
        let mut cursor = InputCursor::new(input);
        let mut window = OutputWindow::new(output, sizes::REDUCE)?;

        if self.uncompressed_size > 0 {
            self.expand(&mut cursor, &mut window)?;
        }
        window.finish()?;

        Ok(DecodeSummary {
            bytes_in: cursor.bytes_consumed(),
            bytes_out: window.total_out(),
            crc32: window.crc32(),
        })
    }

    fn expand<R: Read, W: Write>(
        &self,
        cursor: &mut InputCursor<R>,
        window: &mut OutputWindow<W>,
    ) -> Result<()> {
        let followers = FollowerSets::load(cursor)?;
        let size = self.uncompressed_size;
        let l_mask = self.factor.l_mask();

        let mut state = State::Literal;
        let mut last = 0u8;
        while window.total_out() < size {
            let c = followers.next(cursor, last)?;

            state = match state {
                State::Literal if c == DLE => State::Escape,
                State::Literal => {
                    window.put(c)?;
                    State::Literal
                }
                State::Escape if c == 0 => {
                    window.put(DLE)?;
                    State::Literal
                }
                State::Escape => {
                    let len = (c & l_mask) as usize;
                    if c & l_mask == l_mask {
                        State::Length { v: c, len }
                    } else {
                        State::Distance { v: c, len }
                    }
                }
                State::Length { v, len } => State::Distance {
                    v,
                    len: len + c as usize,
                },
                State::Distance { v, len } => {
                    let high = ((v >> self.factor.d_shift()) & self.factor.d_mask()) as usize;
                    let distance = (high << 8) + c as usize + 1;
                    let remaining = size - window.total_out();
                    let length = ((len + 3) as u64).min(remaining) as usize;
                    window.copy_match_zero_fill(distance, length)?;
                    State::Literal
                }
            };
            last = c;
        }
        Ok(())
    }
}

impl Decoder for Unreducer {
    fn decode_stream<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<DecodeSummary> {
        self.unreduce_stream(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcodec_core::bitstream::BitWriter;

    /// Stream with all follower sets empty, then `bytes` raw.
    fn raw_stream(bytes: &[u8]) -> Vec<u8> {
        let mut writer = BitWriter::new(Vec::new());
        for _ in 0..256 {
            writer.send_bits(0, 6).unwrap();
        }
        for &b in bytes {
            writer.send_bits(b as u32, 8).unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner()
    }

    fn unreduce(data: &[u8], factor: u8, size: u64) -> Result<Vec<u8>> {
        Unreducer::new(ReduceFactor::new(factor).unwrap(), size).decode_all(data)
    }

    #[test]
    fn test_b_table_boundaries() {
        assert_eq!(B_TABLE[0], 8);
        assert_eq!(B_TABLE[1], 1);
        assert_eq!(B_TABLE[2], 1);
        assert_eq!(B_TABLE[3], 2);
        assert_eq!(B_TABLE[4], 2);
        assert_eq!(B_TABLE[5], 3);
        assert_eq!(B_TABLE[8], 3);
        assert_eq!(B_TABLE[9], 4);
        assert_eq!(B_TABLE[32], 5);
        assert_eq!(B_TABLE[33], 6);
        assert_eq!(B_TABLE[128], 7);
        assert_eq!(B_TABLE[129], 8);
        assert_eq!(B_TABLE[255], 8);
    }

    #[test]
    fn test_literals() {
        let data = raw_stream(b"plain");
        assert_eq!(unreduce(&data, 1, 5).unwrap(), b"plain");
    }

    #[test]
    fn test_literal_dle() {
        let data = raw_stream(&[b'a', DLE, 0, b'b']);
        assert_eq!(unreduce(&data, 2, 3).unwrap(), [b'a', DLE, b'b']);
    }

    #[test]
    fn test_back_reference_factor_one() {
        // V = 3: length 3 + 3, distance 2 + 1.
        let data = raw_stream(&[b'a', b'b', b'c', DLE, 3, 2]);
        assert_eq!(unreduce(&data, 1, 9).unwrap(), b"abcabcabc");
    }

    #[test]
    fn test_extended_length_factor_four() {
        // V = 0x0f fills the length bits, the next byte adds 10.
        let data = raw_stream(&[b'x', b'y', b'z', DLE, 0x0f, 10, 2]);
        let expected = b"xyz".repeat(11)[..31].to_vec();
        assert_eq!(unreduce(&data, 4, 31).unwrap(), expected);
    }

    #[test]
    fn test_high_distance_bits() {
        // Factor 3: V = 0x21 gives length 1 + 3 and distance (1 << 8) + 4 + 1.
        let mut bytes = (0..=255u8).filter(|&b| b != DLE).collect::<Vec<_>>();
        bytes.extend_from_slice(&(0..=255u8).filter(|&b| b != DLE).collect::<Vec<_>>());
        let prefix = bytes.clone();
        bytes.extend_from_slice(&[DLE, 0x21, 4]);

        let out = unreduce(&raw_stream(&bytes), 3, prefix.len() as u64 + 4).unwrap();
        let start = prefix.len() - 261;
        assert_eq!(&out[..prefix.len()], &prefix[..]);
        assert_eq!(&out[prefix.len()..], &prefix[start..start + 4]);
    }

    #[test]
    fn test_distance_before_start_reads_zeros() {
        // Factor 2: V = 0x41 gives length 1 + 3 and distance 256 + 9 + 1.
        let data = raw_stream(&[b'q', DLE, 0x41, 9]);
        assert_eq!(unreduce(&data, 2, 5).unwrap(), [b'q', 0, 0, 0, 0]);
    }

    #[test]
    fn test_output_stops_at_size() {
        let data = raw_stream(&[b'a', b'b', b'c', DLE, 3, 2]);
        assert_eq!(unreduce(&data, 1, 7).unwrap(), b"abcabca");
    }

    #[test]
    fn test_follower_sets() {
        // The set for 'a' holds just 'b'; every other set is empty.
        let mut writer = BitWriter::new(Vec::new());
        for x in (0..=255u8).rev() {
            if x == b'a' {
                writer.send_bits(1, 6).unwrap();
                writer.send_bits(b'b' as u32, 8).unwrap();
            } else {
                writer.send_bits(0, 6).unwrap();
            }
        }
        writer.send_bits(b'a' as u32, 8).unwrap();
        // Follower index 0 of 'a' -> 'b'.
        writer.send_bits(0, 1).unwrap();
        writer.send_bits(0, 1).unwrap();
        writer.send_bits(b'c' as u32, 8).unwrap();
        writer.send_bits(b'a' as u32, 8).unwrap();
        // Flag 1: raw byte despite the set.
        writer.send_bits(1, 1).unwrap();
        writer.send_bits(b'z' as u32, 8).unwrap();
        writer.finish().unwrap();
        let data = writer.into_inner();

        assert_eq!(unreduce(&data, 1, 5).unwrap(), b"abcaz");
    }

    #[test]
    fn test_truncated_input() {
        let data = raw_stream(b"abc");
        let err = unreduce(&data, 1, 10).unwrap_err();
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn test_zero_size_reads_nothing() {
        assert!(unreduce(&[], 1, 0).unwrap().is_empty());
    }
}
