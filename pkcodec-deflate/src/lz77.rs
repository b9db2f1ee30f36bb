//! LZ77 match finding for DEFLATE.
//!
//! The encoder keeps a sliding window of twice the DEFLATE history size.
//! Input is read into the upper half; once the current position passes
//! `WSIZE + MAX_DIST` the upper half is moved down and every stored
//! position is rebased.
//!
//! Strings of [`MIN_MATCH`] bytes are hashed into `head`, and `prev` links
//! each position to the previous one with the same hash, forming chains
//! that [`Deflater::longest_match`] walks from newest to oldest.
//!
//! # Strategies
//!
//! - Greedy (levels 1-3): emit the match found at each position. Strings
//!   inside short matches are hashed; long matches are skipped over.
//! - Lazy (levels 4-9): before emitting a match, look one byte ahead and
//!   prefer the next position's match if it is longer.
//! - Stored (level 0): no matching at all.

use crate::deflate::{DeflateConfig, DeflateOptions, DeflateSummary, Strategy};
use crate::trees::{FileType, Trees};
use pkcodec_core::bitstream::BitWriter;
use pkcodec_core::crc::Crc32;
use pkcodec_core::error::{CodecError, Result};
use std::io::{ErrorKind, Read, Write};

/// DEFLATE history size.
pub const WSIZE: usize = 0x8000;

/// Mask for positions within the history.
const WMASK: usize = WSIZE - 1;

/// Shortest match.
pub const MIN_MATCH: usize = 3;

/// Longest match.
pub const MAX_MATCH: usize = 258;

/// Lookahead needed to always find a full-length match, plus room to hash
/// the next string.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Farthest match distance. Keeps `MIN_LOOKAHEAD` clear of the window end.
pub const MAX_DIST: usize = WSIZE - MIN_LOOKAHEAD;

/// Length-3 matches farther than this are not worth a length/distance pair.
const TOO_FAR: usize = 4096;

/// Bytes of input the window holds.
const WINDOW_SIZE: usize = 2 * WSIZE;

const HASH_BITS: usize = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const HASH_MASK: usize = HASH_SIZE - 1;

/// Shift per byte so that after [`MIN_MATCH`] bytes the oldest is gone.
const H_SHIFT: usize = HASH_BITS.div_ceil(MIN_MATCH);

/// End of a hash chain. Position 0 is never a match candidate.
const NIL: usize = 0;

/// Largest stored block.
const MAX_STORED: usize = 0xffff;

/// Streaming DEFLATE encoder over a reader and a writer.
///
/// Build one with [`Deflater::new`] and consume it with [`Deflater::run`];
/// [`crate::deflate::deflate_stream`] does both.
pub struct Deflater<R: Read, W: Write> {
    reader: R,
    out: BitWriter<W>,
    trees: Trees,

    level: u8,
    config: DeflateConfig,

    /// Input window, with slack past `WINDOW_SIZE` for the match scan.
    window: Vec<u8>,
    /// Previous position with the same hash, indexed by `pos & WMASK`.
    prev: Vec<u16>,
    /// Most recent position per hash.
    head: Vec<u16>,
    /// Hash of the string at `strstart`.
    ins_h: usize,

    /// Window position where the current block starts. Negative once the
    /// window has slid past it.
    block_start: i64,
    /// Current position.
    strstart: usize,
    /// Start of the last match found.
    match_start: usize,
    /// Valid bytes from `strstart` on.
    lookahead: usize,
    /// Length of the best match at the previous position.
    prev_length: usize,
    /// The reader has returned 0.
    eofile: bool,

    crc: Crc32,
    bytes_in: u64,
}

impl<R: Read, W: Write> Deflater<R, W> {
    /// Set up an encoder and read the first window of input.
    pub fn new(reader: R, writer: W, options: DeflateOptions) -> Result<Self> {
        let level = options.level.level();
        let config = DeflateConfig::for_level(level)?;
        let trees = Trees::new(level, options.allow_stored_file)?;

        let mut window = Vec::new();
        window.try_reserve_exact(WINDOW_SIZE + MAX_MATCH + MIN_MATCH)?;
        window.resize(WINDOW_SIZE + MAX_MATCH + MIN_MATCH, 0);
        let mut prev = Vec::new();
        prev.try_reserve_exact(WSIZE)?;
        prev.resize(WSIZE, 0);
        let mut head = Vec::new();
        head.try_reserve_exact(HASH_SIZE)?;
        head.resize(HASH_SIZE, 0);

        let mut deflater = Self {
            reader,
            out: BitWriter::new(writer),
            trees,
            level,
            config,
            window,
            prev,
            head,
            ins_h: 0,
            block_start: 0,
            strstart: 0,
            match_start: 0,
            lookahead: 0,
            prev_length: 0,
            eofile: false,
            crc: Crc32::new(),
            bytes_in: 0,
        };
        if DeflateConfig::strategy(level) != Strategy::Stored {
            deflater.lm_init()?;
        }
        Ok(deflater)
    }

    /// Fill the window and prime the hash with the first two bytes.
    fn lm_init(&mut self) -> Result<()> {
        self.lookahead = self.read_buf(0, WINDOW_SIZE)?;
        if self.lookahead == 0 {
            self.eofile = true;
            return Ok(());
        }
        while self.lookahead < MIN_LOOKAHEAD && !self.eofile {
            self.fill_window()?;
        }

        self.ins_h = 0;
        for j in 0..MIN_MATCH - 1 {
            self.ins_h = update_hash(self.ins_h, self.window[j]);
        }
        Ok(())
    }

    /// Compress the whole input and flush the writer.
    pub fn run(mut self) -> Result<DeflateSummary> {
        let strategy = DeflateConfig::strategy(self.level);
        log::debug!("deflate: level {} ({:?})", self.level, strategy);

        let file_type = match strategy {
            Strategy::Stored => self.deflate_stored()?,
            Strategy::Greedy => {
                self.deflate_fast()?;
                self.trees.file_type()
            }
            Strategy::Lazy => {
                self.deflate_lazy()?;
                self.trees.file_type()
            }
        };
        self.out.finish()?;

        Ok(DeflateSummary {
            method: self.trees.method(),
            file_type,
            flags: DeflateConfig::flags(self.level),
            bytes_in: self.bytes_in,
            compressed_len: self.out.bytes_written(),
            crc32: self.crc.finalize(),
        })
    }

    /// Read into `window[start..start + len]` until it is full or the
    /// reader returns 0. Returns the bytes read.
    fn read_buf(&mut self, start: usize, len: usize) -> Result<usize> {
        let buf = &mut self.window[start..start + len];
        let n = read_full(&mut self.reader, buf)?;
        self.crc.update(&buf[..n]);
        self.bytes_in += n as u64;
        Ok(n)
    }

    /// Slide the window if needed, then read more input.
    fn fill_window(&mut self) -> Result<()> {
        let mut more = WINDOW_SIZE - self.lookahead - self.strstart;

        if self.strstart >= WSIZE + MAX_DIST {
            self.window.copy_within(WSIZE..WINDOW_SIZE, 0);
            self.match_start = self.match_start.saturating_sub(WSIZE);
            self.strstart -= WSIZE;
            self.block_start -= WSIZE as i64;

            for link in self.head.iter_mut().chain(self.prev.iter_mut()) {
                let m = *link as usize;
                *link = if m >= WSIZE { (m - WSIZE) as u16 } else { NIL as u16 };
            }
            more += WSIZE;
        }

        if self.eofile {
            return Ok(());
        }
        let end = self.strstart + self.lookahead;
        let n = self.read_buf(end, more)?;
        if n == 0 {
            self.eofile = true;
            // Keep the hash of the last strings deterministic.
            self.window[end] = 0;
            self.window[end + 1] = 0;
        } else {
            self.lookahead += n;
        }
        Ok(())
    }

    /// Hash the string at `pos` into the chains. Returns the previous head
    /// of its chain.
    #[inline]
    fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let hash_head = self.head[self.ins_h] as usize;
        self.prev[pos & WMASK] = hash_head as u16;
        self.head[self.ins_h] = pos as u16;
        hash_head
    }

    /// Find the longest match for `strstart` along the chain from
    /// `cur_match`. Sets `match_start` when it beats `prev_length`.
    fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain_length = self.config.max_chain as usize;
        let nice_match = self.config.nice_length as usize;
        let scan = self.strstart;
        let mut best_len = self.prev_length;
        let limit = if self.strstart > MAX_DIST {
            self.strstart - MAX_DIST
        } else {
            NIL
        };

        if self.prev_length >= self.config.good_length as usize {
            chain_length >>= 2;
        }

        let window = &self.window;
        let mut scan_end1 = window[scan + best_len - 1];
        let mut scan_end = window[scan + best_len];

        'chain: loop {
            let m = cur_match;
            // Cheap rejects first: the bytes that would extend the best
            // match, then the first two.
            if window[m + best_len] == scan_end
                && window[m + best_len - 1] == scan_end1
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let mut len = 2;
                while len < MAX_MATCH && window[scan + len] == window[m + len] {
                    len += 1;
                }
                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_match {
                        break 'chain;
                    }
                    scan_end1 = window[scan + best_len - 1];
                    scan_end = window[scan + best_len];
                }
            }

            cur_match = self.prev[cur_match & WMASK] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length = chain_length.saturating_sub(1);
            if chain_length == 0 {
                break;
            }
        }
        best_len
    }

    /// Whether `hash_head` may be searched from `strstart`.
    #[inline]
    fn searchable(&self, hash_head: usize) -> bool {
        hash_head != NIL
            && self.strstart - hash_head <= MAX_DIST
            && self.strstart <= WINDOW_SIZE - MIN_LOOKAHEAD
    }

    /// End the current block.
    fn flush_block(&mut self, eof: bool) -> Result<u64> {
        let stored_len = (self.strstart as i64 - self.block_start) as u64;
        let buf = if self.block_start >= 0 {
            Some(&self.window[self.block_start as usize..self.strstart])
        } else {
            None
        };
        let compressed = self.trees.flush_block(&mut self.out, buf, stored_len, eof)?;
        self.block_start = self.strstart as i64;
        log::trace!("deflate: {} bytes out after {} in", compressed, self.bytes_in);
        Ok(compressed)
    }

    fn refill(&mut self) -> Result<()> {
        while self.lookahead < MIN_LOOKAHEAD && !self.eofile {
            self.fill_window()?;
        }
        Ok(())
    }

    /// Greedy matching for the fast levels.
    fn deflate_fast(&mut self) -> Result<()> {
        let max_insert_length = self.config.max_lazy as usize;
        self.prev_length = MIN_MATCH - 1;

        while self.lookahead != 0 {
            let hash_head = if self.lookahead >= MIN_MATCH {
                self.insert_string(self.strstart)
            } else {
                NIL
            };

            let mut match_length = 0;
            if self.searchable(hash_head) {
                match_length = self.longest_match(hash_head).min(self.lookahead);
            }

            let block_len = (self.strstart as i64 - self.block_start) as u64;
            let flush = if match_length >= MIN_MATCH {
                let flush = self.trees.tally(
                    self.strstart - self.match_start,
                    match_length - MIN_MATCH,
                    block_len,
                );
                self.lookahead -= match_length;

                if match_length <= max_insert_length && self.lookahead >= MIN_MATCH {
                    // The first string is already hashed.
                    for _ in 1..match_length {
                        self.strstart += 1;
                        self.insert_string(self.strstart);
                    }
                    self.strstart += 1;
                } else {
                    self.strstart += match_length;
                    self.ins_h = self.window[self.strstart] as usize;
                    self.ins_h = update_hash(self.ins_h, self.window[self.strstart + 1]);
                }
                flush
            } else {
                let flush = self
                    .trees
                    .tally(0, self.window[self.strstart] as usize, block_len);
                self.lookahead -= 1;
                self.strstart += 1;
                flush
            };

            if flush {
                self.flush_block(false)?;
            }
            self.refill()?;
        }
        self.flush_block(true)?;
        Ok(())
    }

    /// Lazy matching for the default and best levels.
    fn deflate_lazy(&mut self) -> Result<()> {
        let max_lazy_match = self.config.max_lazy as usize;
        let mut match_available = false;
        let mut match_length = MIN_MATCH - 1;

        while self.lookahead != 0 {
            let hash_head = if self.lookahead >= MIN_MATCH {
                self.insert_string(self.strstart)
            } else {
                NIL
            };

            self.prev_length = match_length;
            let prev_match = self.match_start;
            match_length = MIN_MATCH - 1;

            if self.prev_length < max_lazy_match && self.searchable(hash_head) {
                match_length = self.longest_match(hash_head).min(self.lookahead);
                if match_length == MIN_MATCH && self.strstart - self.match_start > TOO_FAR {
                    match_length = MIN_MATCH - 1;
                }
            }

            let block_len = (self.strstart as i64 - self.block_start) as u64;
            if self.prev_length >= MIN_MATCH && match_length <= self.prev_length {
                // The previous match wins. Hash the rest of its strings,
                // but none that would read past the input.
                let max_insert = (self.strstart + self.lookahead).saturating_sub(MIN_MATCH);
                let flush = self.trees.tally(
                    self.strstart - 1 - prev_match,
                    self.prev_length - MIN_MATCH,
                    block_len,
                );
                self.lookahead -= self.prev_length - 1;
                for _ in 0..self.prev_length - 2 {
                    self.strstart += 1;
                    if self.strstart <= max_insert {
                        self.insert_string(self.strstart);
                    }
                }
                self.strstart += 1;
                match_available = false;
                match_length = MIN_MATCH - 1;

                if flush {
                    self.flush_block(false)?;
                }
            } else if match_available {
                let lc = self.window[self.strstart - 1] as usize;
                if self.trees.tally(0, lc, block_len) {
                    self.flush_block(false)?;
                }
                self.strstart += 1;
                self.lookahead -= 1;
            } else {
                match_available = true;
                self.strstart += 1;
                self.lookahead -= 1;
            }
            self.refill()?;
        }

        if match_available {
            let lc = self.window[self.strstart - 1] as usize;
            let block_len = (self.strstart as i64 - self.block_start) as u64;
            self.trees.tally(0, lc, block_len);
        }
        self.flush_block(true)?;
        Ok(())
    }

    /// Level 0: copy the input into stored blocks. Returns the data type
    /// guessed from the first block.
    fn deflate_stored(&mut self) -> Result<FileType> {
        let mut buf = vec![0u8; MAX_STORED];
        let mut file_type = FileType::Unknown;

        loop {
            let n = read_full(&mut self.reader, &mut buf)?;
            self.crc.update(&buf[..n]);
            self.bytes_in += n as u64;

            if file_type == FileType::Unknown {
                let mut freq = [0u32; 256];
                for &b in &buf[..n] {
                    freq[b as usize] += 1;
                }
                file_type = FileType::classify(&freq);
            }

            // A full block may be followed by more input; a short one ends
            // the stream, even when empty.
            let last = n < MAX_STORED;
            self.out.send_bits(last as u32, 3)?;
            self.out.copy_block(&buf[..n], true)?;
            if last {
                break;
            }
        }
        Ok(file_type)
    }
}

impl<R: Read, W: Write> std::fmt::Debug for Deflater<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflater")
            .field("level", &self.level)
            .field("strstart", &self.strstart)
            .field("lookahead", &self.lookahead)
            .field("bytes_in", &self.bytes_in)
            .finish_non_exhaustive()
    }
}

#[inline]
fn update_hash(h: usize, c: u8) -> usize {
    ((h << H_SHIFT) ^ c as usize) & HASH_MASK
}

/// Read until `buf` is full or the reader reports end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("deflate: read failed after {} bytes: {}", filled, e);
                return Err(CodecError::input(e));
            }
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    fn encoder(data: &[u8], level: u8) -> Deflater<&[u8], Vec<u8>> {
        Deflater::new(data, Vec::new(), DeflateOptions::new(level).unwrap()).unwrap()
    }

    #[test]
    fn test_hash_forgets_old_bytes() {
        let mut a = 0;
        let mut b = 0;
        for c in [1u8, 2, 3, 4, 5, 6] {
            a = update_hash(a, c);
        }
        for c in [9u8, 9, 9, 4, 5, 6] {
            b = update_hash(b, c);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_lm_init_reads_whole_window() {
        let data = vec![7u8; 3 * WSIZE];
        let enc = encoder(&data, 6);
        assert_eq!(enc.lookahead, WINDOW_SIZE);
        assert_eq!(enc.bytes_in, WINDOW_SIZE as u64);
        assert!(!enc.eofile);
    }

    #[test]
    fn test_lm_init_short_input_hits_eof() {
        let enc = encoder(b"short", 6);
        assert_eq!(enc.lookahead, 5);
        assert!(enc.eofile);
    }

    #[test]
    fn test_fill_window_slides() {
        let data: Vec<u8> = (0..3 * WSIZE).map(|i| (i % 251) as u8).collect();
        let mut enc = encoder(&data, 6);
        enc.strstart = WSIZE + MAX_DIST;
        enc.lookahead = WINDOW_SIZE - enc.strstart;
        enc.match_start = WSIZE + 10;
        enc.head[5] = (WSIZE + 100) as u16;
        enc.head[6] = 100;
        enc.prev[7] = (WSIZE + 1) as u16;

        enc.fill_window().unwrap();

        assert_eq!(enc.strstart, MAX_DIST);
        assert_eq!(enc.match_start, 10);
        assert_eq!(enc.block_start, -(WSIZE as i64));
        assert_eq!(enc.head[5], 100);
        assert_eq!(enc.head[6], NIL as u16);
        assert_eq!(enc.prev[7], 1);
        // The upper half moved down and the rest of the input followed.
        assert_eq!(enc.window[0], data[WSIZE]);
        assert_eq!(enc.lookahead, WINDOW_SIZE - MAX_DIST);
        assert_eq!(enc.window[WSIZE], data[2 * WSIZE]);
    }

    #[test]
    fn test_longest_match_finds_repeat() {
        let data = b"xabcdefghij-abcdefghij-";
        let mut enc = encoder(data, 9);
        enc.prev_length = MIN_MATCH - 1;
        enc.strstart = 12;
        assert_eq!(enc.longest_match(1), 11);
        assert_eq!(enc.match_start, 1);
    }

    /// Older, longer candidate at 1; newer, shorter one at 30; current
    /// string at 50.
    fn two_candidates() -> Vec<u8> {
        let mut data = b"_abcdefghijklmnopqrs".to_vec();
        data.extend_from_slice(&[b'_'; 10]);
        data.extend_from_slice(b"abcdefghijZ");
        data.extend_from_slice(&[b'_'; 9]);
        data.extend_from_slice(b"abcdefghijklmnopqrs-");
        data
    }

    #[test]
    fn test_nice_length_stops_search() {
        let data = two_candidates();

        // Level 1 is satisfied with 8 bytes and never reaches position 1.
        let mut enc = encoder(&data, 1);
        enc.prev_length = MIN_MATCH - 1;
        enc.strstart = 50;
        enc.prev[30] = 1;
        assert_eq!(enc.longest_match(30), 10);
        assert_eq!(enc.match_start, 30);

        let mut enc = encoder(&data, 9);
        enc.prev_length = MIN_MATCH - 1;
        enc.strstart = 50;
        enc.prev[30] = 1;
        assert_eq!(enc.longest_match(30), 19);
        assert_eq!(enc.match_start, 1);
    }

    #[test]
    fn test_far_distance_matches() {
        // A 40K gap keeps the repeat beyond reach of a single window half.
        let mut seed = 99u32;
        let mut noise = || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (seed >> 16) as u8
        };
        let block: Vec<u8> = (0..2000).map(|_| noise()).collect();
        let mut data = block.clone();
        data.extend((0..40_000).map(|_| noise()));
        data.extend_from_slice(&block);
        data.extend((0..30_000).map(|_| noise()));
        data.extend_from_slice(&block);

        for level in [1, 4, 9] {
            let mut out = Vec::new();
            let options = DeflateOptions::new(level).unwrap();
            let summary = crate::deflate::deflate_stream(&data[..], &mut out, options).unwrap();
            assert_eq!(summary.bytes_in, data.len() as u64);
            assert_eq!(inflate(&out).unwrap(), data, "level {}", level);
        }
    }

    #[test]
    fn test_stored_level_uses_only_stored_blocks() {
        let data = vec![b'z'; MAX_STORED + 10];
        let mut out = Vec::new();
        crate::deflate::deflate_stream(&data[..], &mut out, DeflateOptions::new(0).unwrap())
            .unwrap();

        // Two blocks: one full, one final with the remaining 10 bytes.
        assert_eq!(out.len(), 5 + MAX_STORED + 5 + 10);
        assert_eq!(out[0], 0x00);
        assert_eq!(&out[1..5], &[0xff, 0xff, 0x00, 0x00]);
        let second = 5 + MAX_STORED;
        assert_eq!(out[second], 0x01);
        assert_eq!(&out[second + 1..second + 5], &[10, 0, 0xf5, 0xff]);
        assert_eq!(inflate(&out).unwrap(), data);
    }

    #[test]
    fn test_stored_level_exact_block_multiple() {
        let data = vec![1u8; MAX_STORED];
        let mut out = Vec::new();
        crate::deflate::deflate_stream(&data[..], &mut out, DeflateOptions::new(0).unwrap())
            .unwrap();
        // Full block, then an empty final block.
        assert_eq!(out.len(), 5 + MAX_STORED + 5);
        assert_eq!(&out[out.len() - 5..], &[0x01, 0x00, 0x00, 0xff, 0xff]);
        assert_eq!(inflate(&out).unwrap(), data);
    }
}
