//! Code tables for DEFLATE and DEFLATE64 (RFC 1951).
//!
//! The decoder looks up length and distance symbols through these base and
//! extra-bit tables; the encoder derives its own lookup tables from the same
//! data in [`crate::trees`].

/// Invalid-symbol marker in the extra-bits tables.
pub const INVALID_EXTRA: u8 = 99;

/// End-of-block symbol of the literal/length alphabet.
pub const END_OF_BLOCK: u16 = 256;

/// Literal/length table width for dynamic and fixed blocks.
pub const LBITS: u32 = 9;

/// Distance table width for dynamic blocks.
pub const DBITS: u32 = 6;

/// Code-length table width.
pub const BLBITS: u32 = 7;

/// First-level width of the fixed literal/length table.
pub const FIXED_BL: u32 = 7;

/// First-level width of the fixed distance table.
pub const FIXED_BD: u32 = 5;

/// Longest code length DEFLATE allows.
pub const MAX_BITS: usize = 15;

/// Longest code length for the code-length alphabet.
pub const MAX_BL_BITS: usize = 7;

/// Number of literal/length codes, including the two unused ones.
pub const L_CODES_FIXED: usize = 288;

/// Largest `HLIT + 257` a dynamic header may announce.
pub const L_CODES: usize = 286;

/// Distance codes in DEFLATE.
pub const D_CODES: usize = 30;

/// Distance codes in DEFLATE64.
pub const D_CODES_64: usize = 32;

/// Number of code-length codes.
pub const BL_CODES: usize = 19;

/// Number of length codes, not counting the literals and end of block.
pub const LENGTH_CODES: usize = 29;

/// Order of code length codes in dynamic block header.
pub const BORDER: [usize; BL_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length code base values for codes 257-287 (DEFLATE).
pub const CPLENS: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];

/// Length code base values for codes 257-287 (DEFLATE64).
///
/// Code 285 is a 16-bit extended length starting at 3.
pub const CPLENS64: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 3, 0, 0,
];

/// Extra bits for length codes 257-287 (DEFLATE). 286 and 287 are invalid.
pub const CPLEXT: [u8; 31] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
    INVALID_EXTRA, INVALID_EXTRA,
];

/// Extra bits for length codes 257-287 (DEFLATE64).
pub const CPLEXT64: [u8; 31] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 16,
    INVALID_EXTRA, INVALID_EXTRA,
];

/// Distance code base values. Codes 30 and 31 exist only in DEFLATE64.
pub const CPDIST: [u16; D_CODES_64] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];

/// Extra bits for distance codes (DEFLATE). Codes 30 and 31 are invalid.
pub const CPDEXT: [u8; D_CODES_64] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, INVALID_EXTRA, INVALID_EXTRA,
];

/// Extra bits for distance codes (DEFLATE64).
pub const CPDEXT64: [u8; D_CODES_64] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14,
];

/// Extra bits per length code, as the encoder sends them.
pub const EXTRA_LBITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Extra bits per distance code, as the encoder sends them.
pub const EXTRA_DBITS: [u8; D_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Extra bits per code-length code.
pub const EXTRA_BLBITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; L_CODES_FIXED] {
    let mut lengths = [0u8; L_CODES_FIXED];

    for (symbol, len) in lengths.iter_mut().enumerate() {
        *len = match symbol {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
    }

    lengths
}

/// Fixed distance code lengths: every code uses 5 bits.
///
/// DEFLATE64 reads 32 codes; DEFLATE reads 30 and leaves the code space
/// incomplete.
pub fn fixed_distance_lengths(count: usize) -> Vec<u8> {
    vec![5u8; count]
}
