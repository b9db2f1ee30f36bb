//! Huffman trees and block output for the DEFLATE encoder.
//!
//! The match finder records every literal and match with
//! [`Trees::tally`]. When a block ends, [`Trees::flush_block`] builds
//! optimal literal/length and distance trees from the recorded frequencies,
//! compares the cost of a dynamic block, a static (fixed-code) block and a
//! stored block, and emits the cheapest.
//!
//! # Data layout
//!
//! Each tree is a flat array of [`CtData`] nodes. Leaves come first (one per
//! symbol), internal nodes are appended while the tree is built and
//! refer to their parent through `dad`. The heap used to merge nodes holds
//! indices into that array.

use crate::tables::{
    BL_CODES, BORDER, D_CODES, END_OF_BLOCK, EXTRA_BLBITS, EXTRA_DBITS, EXTRA_LBITS, L_CODES,
    L_CODES_FIXED, LENGTH_CODES, MAX_BITS, MAX_BL_BITS, fixed_litlen_lengths,
};
use pkcodec_core::bitstream::{BitWriter, bi_reverse};
use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::method::Method;
use std::io::Write;

/// Literals and matches buffered per block.
pub const LIT_BUFSIZE: usize = 0x8000;

/// Distances buffered per block.
pub const DIST_BUFSIZE: usize = LIT_BUFSIZE;

/// Number of literal bytes 0..255.
const LITERALS: usize = 256;

/// Maximum heap size: every leaf plus every internal node.
const HEAP_SIZE: usize = 2 * L_CODES + 1;

/// Repeat previous bit length 3-6 times (2 bits of repeat count).
const REP_3_6: usize = 16;

/// Repeat a zero length 3-10 times (3 bits of repeat count).
const REPZ_3_10: usize = 17;

/// Repeat a zero length 11-138 times (7 bits of repeat count).
const REPZ_11_138: usize = 18;

const STORED_BLOCK: u32 = 0;
const STATIC_TREES: u32 = 1;
const DYN_TREES: u32 = 2;

/// One node of a Huffman tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtData {
    /// Frequency count.
    pub freq: u32,
    /// Bit-reversed code, once generated.
    pub code: u16,
    /// Parent node.
    pub dad: u16,
    /// Code length in bits.
    pub len: u16,
}

/// Guess at the kind of data being compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// No block has been flushed yet.
    #[default]
    Unknown,
    /// Mostly bytes outside printable ASCII.
    Binary,
    /// Mostly printable ASCII.
    Ascii,
}

impl FileType {
    /// Classify by literal frequencies (indices 0..256).
    ///
    /// The data is binary when bytes 0..6 and 128..255 make up more than a
    /// quarter of the bytes 7..127.
    pub fn classify(freq: &[u32]) -> Self {
        let sum = |range: std::ops::Range<usize>| -> u64 {
            freq[range].iter().map(|&f| f as u64).sum()
        };
        let bin_freq = sum(0..7) + sum(128..LITERALS);
        let ascii_freq = sum(7..128);
        if bin_freq > ascii_freq >> 2 {
            Self::Binary
        } else {
            Self::Ascii
        }
    }
}

/// Static description of one alphabet.
struct TreeDesc<'a> {
    /// Fixed-code tree used to price static blocks, if any.
    static_tree: Option<&'a [CtData]>,
    /// Extra bits per code, starting at `extra_base`.
    extra_bits: &'static [u8],
    /// First code with extra bits.
    extra_base: usize,
    /// Number of leaves.
    elems: usize,
    /// Longest allowed code.
    max_length: usize,
}

/// Scratch state for building trees: the merge heap, node depths and the
/// running cost estimates of the current block.
#[derive(Debug)]
pub(crate) struct HeapBuilder {
    heap: [usize; HEAP_SIZE],
    depth: [u8; HEAP_SIZE],
    bl_count: [u16; MAX_BITS + 1],
    heap_len: usize,
    heap_max: usize,
    /// Bit length of the block with dynamic trees.
    opt_len: i64,
    /// Bit length of the block with static trees.
    static_len: i64,
}

impl HeapBuilder {
    pub(crate) fn new() -> Self {
        Self {
            heap: [0; HEAP_SIZE],
            depth: [0; HEAP_SIZE],
            bl_count: [0; MAX_BITS + 1],
            heap_len: 0,
            heap_max: 0,
            opt_len: 0,
            static_len: 0,
        }
    }

    #[inline]
    fn smaller(&self, tree: &[CtData], n: usize, m: usize) -> bool {
        tree[n].freq < tree[m].freq
            || (tree[n].freq == tree[m].freq && self.depth[n] <= self.depth[m])
    }

    /// Restore the heap property by sifting node `k` down.
    fn pqdownheap(&mut self, tree: &[CtData], mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1;
        while j <= self.heap_len {
            if j < self.heap_len && self.smaller(tree, self.heap[j + 1], self.heap[j]) {
                j += 1;
            }
            if self.smaller(tree, v, self.heap[j]) {
                break;
            }
            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }
        self.heap[k] = v;
    }

    /// Build a Huffman tree for `tree` and assign its codes.
    ///
    /// Returns the largest code with a nonzero frequency. At least two codes
    /// always get a length, so the tree is never degenerate.
    fn build_tree(&mut self, tree: &mut [CtData], desc: &TreeDesc<'_>) -> usize {
        let elems = desc.elems;
        let mut max_code: i32 = -1;
        let mut node = elems;

        self.heap_len = 0;
        self.heap_max = HEAP_SIZE;
        for (n, leaf) in tree.iter_mut().enumerate().take(elems) {
            if leaf.freq != 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = n;
                max_code = n as i32;
                self.depth[n] = 0;
            } else {
                leaf.len = 0;
            }
        }

        // Force at least two codes of nonzero frequency.
        while self.heap_len < 2 {
            let new = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            self.heap_len += 1;
            self.heap[self.heap_len] = new;
            tree[new].freq = 1;
            self.depth[new] = 0;
            self.opt_len -= 1;
            if let Some(stree) = desc.static_tree {
                self.static_len -= stree[new].len as i64;
            }
        }
        let max_code = max_code as usize;

        for n in (1..=self.heap_len / 2).rev() {
            self.pqdownheap(tree, n);
        }

        // Merge the two least frequent nodes until one is left.
        loop {
            let n = self.heap[1];
            self.heap[1] = self.heap[self.heap_len];
            self.heap_len -= 1;
            self.pqdownheap(tree, 1);
            let m = self.heap[1];

            self.heap_max -= 1;
            self.heap[self.heap_max] = n;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m;

            tree[node].freq = tree[n].freq + tree[m].freq;
            self.depth[node] = self.depth[n].max(self.depth[m]).wrapping_add(1);
            tree[n].dad = node as u16;
            tree[m].dad = node as u16;

            self.heap[1] = node;
            node += 1;
            self.pqdownheap(tree, 1);

            if self.heap_len < 2 {
                break;
            }
        }
        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[1];

        self.gen_bitlen(tree, desc, max_code);
        gen_codes(tree, max_code, &self.bl_count);
        max_code
    }

    /// Compute code lengths from the tree shape, limited to `max_length`,
    /// and add the block cost to `opt_len` and `static_len`.
    fn gen_bitlen(&mut self, tree: &mut [CtData], desc: &TreeDesc<'_>, max_code: usize) {
        let max_length = desc.max_length;
        let mut overflow = 0i32;

        self.bl_count = [0; MAX_BITS + 1];

        // Parents sit before their children in heap[heap_max..].
        tree[self.heap[self.heap_max]].len = 0;
        for h in self.heap_max + 1..HEAP_SIZE {
            let n = self.heap[h];
            let mut bits = tree[tree[n].dad as usize].len as usize + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            tree[n].len = bits as u16;
            if n > max_code {
                continue;
            }

            self.bl_count[bits] += 1;
            let xbits = if n >= desc.extra_base {
                desc.extra_bits[n - desc.extra_base] as i64
            } else {
                0
            };
            let f = tree[n].freq as i64;
            self.opt_len += f * (bits as i64 + xbits);
            if let Some(stree) = desc.static_tree {
                self.static_len += f * (stree[n].len as i64 + xbits);
            }
        }
        if overflow == 0 {
            return;
        }

        log::debug!(
            "deflate: {} codes over {} bits, redistributing",
            overflow,
            max_length
        );

        // Move leaves from the longest level up, two at a time.
        loop {
            let mut bits = max_length - 1;
            while self.bl_count[bits] == 0 {
                bits -= 1;
            }
            self.bl_count[bits] -= 1;
            self.bl_count[bits + 1] += 2;
            self.bl_count[max_length] -= 1;
            overflow -= 2;
            if overflow <= 0 {
                break;
            }
        }

        // Reassign lengths, longest first, in heap (frequency) order.
        let mut h = HEAP_SIZE;
        for bits in (1..=max_length).rev() {
            let mut n = self.bl_count[bits];
            while n != 0 {
                h -= 1;
                let m = self.heap[h];
                if m > max_code {
                    continue;
                }
                if tree[m].len as usize != bits {
                    self.opt_len += (bits as i64 - tree[m].len as i64) * tree[m].freq as i64;
                    tree[m].len = bits as u16;
                }
                n -= 1;
            }
        }
    }
}

/// Assign canonical, bit-reversed codes to `tree[0..=max_code]`.
fn gen_codes(tree: &mut [CtData], max_code: usize, bl_count: &[u16; MAX_BITS + 1]) {
    let mut next_code = [0u32; MAX_BITS + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_BITS {
        code = (code + bl_count[bits - 1] as u32) << 1;
        next_code[bits] = code;
    }

    for leaf in tree.iter_mut().take(max_code + 1) {
        let len = leaf.len as usize;
        if len == 0 {
            continue;
        }
        leaf.code = bi_reverse(next_code[len], len as u32) as u16;
        next_code[len] += 1;
    }
}

/// Encoder-side Huffman state for one stream.
#[derive(Debug)]
pub struct Trees {
    dyn_ltree: [CtData; HEAP_SIZE],
    dyn_dtree: [CtData; 2 * D_CODES + 1],
    static_ltree: [CtData; L_CODES_FIXED],
    static_dtree: [CtData; D_CODES],
    bl_tree: [CtData; 2 * BL_CODES + 1],
    l_max_code: usize,
    d_max_code: usize,

    heap: HeapBuilder,

    /// Length (minus 3) to length code.
    length_code: [u8; 256],
    /// Distance (minus 1) to distance code; see [`Trees::d_code`].
    dist_code: [u8; 512],
    base_length: [u16; LENGTH_CODES],
    base_dist: [u16; D_CODES],

    /// Literal bytes or match lengths (minus 3).
    l_buf: Vec<u8>,
    /// Match distances (minus 1).
    d_buf: Vec<u16>,
    /// One bit per `l_buf` entry: set for a match.
    flag_buf: Vec<u8>,
    last_lit: usize,
    last_dist: usize,
    last_flags: usize,
    flags: u8,
    flag_bit: u8,

    level: u8,
    allow_stored_file: bool,
    file_type: FileType,
    method: Method,
    /// Compressed length so far, in bits.
    compressed_len: u64,
    /// Uncompressed bytes flushed so far.
    input_len: u64,
}

impl Trees {
    /// Set up the code tables, static trees and literal buffers.
    pub fn new(level: u8, allow_stored_file: bool) -> Result<Self> {
        let mut l_buf = Vec::new();
        l_buf.try_reserve_exact(LIT_BUFSIZE)?;
        l_buf.resize(LIT_BUFSIZE, 0);
        let mut d_buf = Vec::new();
        d_buf.try_reserve_exact(DIST_BUFSIZE)?;
        d_buf.resize(DIST_BUFSIZE, 0);
        let mut flag_buf = Vec::new();
        flag_buf.try_reserve_exact(LIT_BUFSIZE / 8)?;
        flag_buf.resize(LIT_BUFSIZE / 8, 0);

        let mut trees = Self {
            dyn_ltree: [CtData::default(); HEAP_SIZE],
            dyn_dtree: [CtData::default(); 2 * D_CODES + 1],
            static_ltree: [CtData::default(); L_CODES_FIXED],
            static_dtree: [CtData::default(); D_CODES],
            bl_tree: [CtData::default(); 2 * BL_CODES + 1],
            l_max_code: 0,
            d_max_code: 0,
            heap: HeapBuilder::new(),
            length_code: [0; 256],
            dist_code: [0; 512],
            base_length: [0; LENGTH_CODES],
            base_dist: [0; D_CODES],
            l_buf,
            d_buf,
            flag_buf,
            last_lit: 0,
            last_dist: 0,
            last_flags: 0,
            flags: 0,
            flag_bit: 1,
            level,
            allow_stored_file,
            file_type: FileType::Unknown,
            method: Method::Deflated,
            compressed_len: 0,
            input_len: 0,
        };
        trees.init_tables();
        trees.init_block();
        Ok(trees)
    }

    fn init_tables(&mut self) {
        // Length (0..255 for 3..258) to length code.
        let mut length = 0usize;
        for code in 0..LENGTH_CODES - 1 {
            self.base_length[code] = length as u16;
            for _ in 0..1 << EXTRA_LBITS[code] {
                self.length_code[length] = code as u8;
                length += 1;
            }
        }
        // 258 can be coded as 255 + 3 with code 284; use code 285 instead.
        self.length_code[length - 1] = (LENGTH_CODES - 1) as u8;

        // Distances up to 256 directly, the rest by their top 8 bits.
        let mut dist = 0usize;
        for code in 0..16 {
            self.base_dist[code] = dist as u16;
            for _ in 0..1 << EXTRA_DBITS[code] {
                self.dist_code[dist] = code as u8;
                dist += 1;
            }
        }
        dist >>= 7;
        for code in 16..D_CODES {
            self.base_dist[code] = (dist << 7) as u16;
            for _ in 0..1 << (EXTRA_DBITS[code] - 7) {
                self.dist_code[256 + dist] = code as u8;
                dist += 1;
            }
        }

        let mut bl_count = [0u16; MAX_BITS + 1];
        for (leaf, len) in self.static_ltree.iter_mut().zip(fixed_litlen_lengths()) {
            leaf.len = len as u16;
            bl_count[len as usize] += 1;
        }
        gen_codes(&mut self.static_ltree, L_CODES_FIXED - 1, &bl_count);

        for (n, leaf) in self.static_dtree.iter_mut().enumerate() {
            leaf.len = 5;
            leaf.code = bi_reverse(n as u32, 5) as u16;
        }
    }

    fn init_block(&mut self) {
        for leaf in self.dyn_ltree.iter_mut().take(L_CODES) {
            leaf.freq = 0;
        }
        for leaf in self.dyn_dtree.iter_mut().take(D_CODES) {
            leaf.freq = 0;
        }
        for leaf in self.bl_tree.iter_mut().take(BL_CODES) {
            leaf.freq = 0;
        }
        self.dyn_ltree[END_OF_BLOCK as usize].freq = 1;
        self.heap.opt_len = 0;
        self.heap.static_len = 0;
        self.last_lit = 0;
        self.last_dist = 0;
        self.last_flags = 0;
        self.flags = 0;
        self.flag_bit = 1;
    }

    /// Distance code for a distance minus one.
    #[inline]
    fn d_code(&self, dist: usize) -> usize {
        if dist < 256 {
            self.dist_code[dist] as usize
        } else {
            self.dist_code[256 + (dist >> 7)] as usize
        }
    }

    /// The method actually used: [`Method::Stored`] after the whole-input
    /// store fallback, [`Method::Deflated`] otherwise.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Data classification from the first flushed block.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Uncompressed bytes covered by the flushed blocks.
    pub fn input_len(&self) -> u64 {
        self.input_len
    }

    /// Record a literal (`dist == 0`, `lc` is the byte) or a match (`dist`
    /// is the distance, `lc` the length minus 3).
    ///
    /// `block_len` is the number of input bytes covered by the current
    /// block. Returns `true` when the block should be flushed now.
    pub fn tally(&mut self, dist: usize, lc: usize, block_len: u64) -> bool {
        self.l_buf[self.last_lit] = lc as u8;
        self.last_lit += 1;
        if dist == 0 {
            self.dyn_ltree[lc].freq += 1;
        } else {
            let dist = dist - 1;
            self.dyn_ltree[self.length_code[lc] as usize + LITERALS + 1].freq += 1;
            let dcode = self.d_code(dist);
            self.dyn_dtree[dcode].freq += 1;
            self.d_buf[self.last_dist] = dist as u16;
            self.last_dist += 1;
            self.flags |= self.flag_bit;
        }
        self.flag_bit <<= 1;

        if self.last_lit & 7 == 0 {
            self.flag_buf[self.last_flags] = self.flags;
            self.last_flags += 1;
            self.flags = 0;
            self.flag_bit = 1;
        }

        // Try to guess if it is profitable to stop the current block here.
        if self.level > 2 && self.last_lit & 0xfff == 0 {
            let mut out_length = self.last_lit as u64 * 8;
            for (dcode, leaf) in self.dyn_dtree.iter().take(D_CODES).enumerate() {
                out_length += leaf.freq as u64 * (5 + EXTRA_DBITS[dcode] as u64);
            }
            out_length >>= 3;
            if self.last_dist < self.last_lit / 2 && out_length < block_len / 2 {
                return true;
            }
        }
        self.last_lit == LIT_BUFSIZE - 1 || self.last_dist == DIST_BUFSIZE
    }

    /// Run-length scan of a tree's code lengths, counting bit-length
    /// symbol frequencies.
    fn scan_tree(bl_tree: &mut [CtData], tree: &mut [CtData], max_code: usize) {
        let mut prevlen: i32 = -1;
        let mut nextlen = tree[0].len as i32;
        let mut count = 0;
        let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

        tree[max_code + 1].len = 0xffff;

        for n in 0..=max_code {
            let curlen = nextlen;
            nextlen = tree[n + 1].len as i32;
            count += 1;
            if count < max_count && curlen == nextlen {
                continue;
            } else if count < min_count {
                bl_tree[curlen as usize].freq += count;
            } else if curlen != 0 {
                if curlen != prevlen {
                    bl_tree[curlen as usize].freq += 1;
                }
                bl_tree[REP_3_6].freq += 1;
            } else if count <= 10 {
                bl_tree[REPZ_3_10].freq += 1;
            } else {
                bl_tree[REPZ_11_138].freq += 1;
            }
            count = 0;
            prevlen = curlen;
            (max_count, min_count) = if nextlen == 0 {
                (138, 3)
            } else if curlen == nextlen {
                (6, 3)
            } else {
                (7, 4)
            };
        }
    }

    /// Send a tree's code lengths using the bit-length code.
    fn send_tree<W: Write>(
        bl_tree: &[CtData],
        tree: &[CtData],
        max_code: usize,
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        let mut prevlen: i32 = -1;
        let mut nextlen = tree[0].len as i32;
        let mut count = 0u32;
        let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

        let send_code = |out: &mut BitWriter<W>, c: usize| {
            out.send_bits(bl_tree[c].code as u32, bl_tree[c].len as u32)
        };

        for n in 0..=max_code {
            let curlen = nextlen;
            nextlen = tree[n + 1].len as i32;
            count += 1;
            if count < max_count && curlen == nextlen {
                continue;
            } else if count < min_count {
                for _ in 0..count {
                    send_code(out, curlen as usize)?;
                }
            } else if curlen != 0 {
                if curlen != prevlen {
                    send_code(out, curlen as usize)?;
                    count -= 1;
                }
                send_code(out, REP_3_6)?;
                out.send_bits(count - 3, 2)?;
            } else if count <= 10 {
                send_code(out, REPZ_3_10)?;
                out.send_bits(count - 3, 3)?;
            } else {
                send_code(out, REPZ_11_138)?;
                out.send_bits(count - 11, 7)?;
            }
            count = 0;
            prevlen = curlen;
            (max_count, min_count) = if nextlen == 0 {
                (138, 3)
            } else if curlen == nextlen {
                (6, 3)
            } else {
                (7, 4)
            };
        }
        Ok(())
    }

    /// Build the bit-length tree. Returns the index in [`BORDER`] of the
    /// last bit-length code to send (at least 3, so 4 codes go out).
    fn build_bl_tree(&mut self) -> usize {
        Self::scan_tree(&mut self.bl_tree, &mut self.dyn_ltree, self.l_max_code);
        Self::scan_tree(&mut self.bl_tree, &mut self.dyn_dtree, self.d_max_code);

        self.heap.build_tree(
            &mut self.bl_tree,
            &TreeDesc {
                static_tree: None,
                extra_bits: &EXTRA_BLBITS,
                extra_base: 0,
                elems: BL_CODES,
                max_length: MAX_BL_BITS,
            },
        );

        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3 && self.bl_tree[BORDER[max_blindex]].len == 0 {
            max_blindex -= 1;
        }
        // Header: 5 + 5 + 4 bits, then 3 bits per bit-length code.
        self.heap.opt_len += 3 * (max_blindex as i64 + 1) + 5 + 5 + 4;
        max_blindex
    }

    fn send_all_trees<W: Write>(
        &self,
        lcodes: usize,
        dcodes: usize,
        blcodes: usize,
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        out.send_bits((lcodes - 257) as u32, 5)?;
        out.send_bits((dcodes - 1) as u32, 5)?;
        out.send_bits((blcodes - 4) as u32, 4)?;
        for &symbol in BORDER.iter().take(blcodes) {
            out.send_bits(self.bl_tree[symbol].len as u32, 3)?;
        }
        Self::send_tree(&self.bl_tree, &self.dyn_ltree, lcodes - 1, out)?;
        Self::send_tree(&self.bl_tree, &self.dyn_dtree, dcodes - 1, out)
    }

    /// Emit the buffered literals and matches with the given trees.
    fn compress_block<W: Write>(
        &self,
        ltree: &[CtData],
        dtree: &[CtData],
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        let send_code = |out: &mut BitWriter<W>, tree: &[CtData], c: usize| {
            out.send_bits(tree[c].code as u32, tree[c].len as u32)
        };

        let mut dx = 0;
        let mut fx = 0;
        let mut flag = 0u8;
        for lx in 0..self.last_lit {
            if lx & 7 == 0 {
                flag = self.flag_buf[fx];
                fx += 1;
            }
            let lc = self.l_buf[lx] as usize;
            if flag & 1 == 0 {
                send_code(out, ltree, lc)?;
            } else {
                let code = self.length_code[lc] as usize;
                send_code(out, ltree, code + LITERALS + 1)?;
                let extra = EXTRA_LBITS[code] as u32;
                if extra != 0 {
                    out.send_bits((lc - self.base_length[code] as usize) as u32, extra)?;
                }

                let dist = self.d_buf[dx] as usize;
                dx += 1;
                let code = self.d_code(dist);
                send_code(out, dtree, code)?;
                let extra = EXTRA_DBITS[code] as u32;
                if extra != 0 {
                    out.send_bits((dist - self.base_dist[code] as usize) as u32, extra)?;
                }
            }
            flag >>= 1;
        }
        send_code(out, ltree, END_OF_BLOCK as usize)
    }

    /// End the current block and write it out.
    ///
    /// `buf` is the block's uncompressed bytes when they are still in the
    /// window (`None` once the window has slid past the block start);
    /// `stored_len` is their count. Returns the compressed length so far,
    /// in bytes.
    pub fn flush_block<W: Write>(
        &mut self,
        out: &mut BitWriter<W>,
        buf: Option<&[u8]>,
        stored_len: u64,
        eof: bool,
    ) -> Result<u64> {
        self.flag_buf[self.last_flags] = self.flags;

        if self.file_type == FileType::Unknown {
            let freq: Vec<u32> = self.dyn_ltree[..LITERALS].iter().map(|l| l.freq).collect();
            self.file_type = FileType::classify(&freq);
        }

        self.l_max_code = self.heap.build_tree(
            &mut self.dyn_ltree,
            &TreeDesc {
                static_tree: Some(&self.static_ltree),
                extra_bits: &EXTRA_LBITS,
                extra_base: LITERALS + 1,
                elems: L_CODES,
                max_length: MAX_BITS,
            },
        );
        self.d_max_code = self.heap.build_tree(
            &mut self.dyn_dtree,
            &TreeDesc {
                static_tree: Some(&self.static_dtree),
                extra_bits: &EXTRA_DBITS,
                extra_base: 0,
                elems: D_CODES,
                max_length: MAX_BITS,
            },
        );
        let max_blindex = self.build_bl_tree();

        // Block lengths in bytes, including the 3-bit header.
        let mut opt_lenb = ((self.heap.opt_len + 3 + 7) >> 3).max(0) as u64;
        let static_lenb = ((self.heap.static_len + 3 + 7) >> 3).max(0) as u64;
        self.input_len += stored_len;
        if static_lenb <= opt_lenb {
            opt_lenb = static_lenb;
        }

        if self.allow_stored_file && stored_len <= opt_lenb && eof && self.compressed_len == 0 {
            // The whole input fits one block and does not compress.
            let buf = buf.ok_or(CodecError::BlockVanished)?;
            log::debug!("deflate: storing whole input ({} bytes)", stored_len);
            out.copy_block(buf, false)?;
            self.compressed_len = stored_len << 3;
            self.method = Method::Stored;
        } else if let Some(buf) = buf.filter(|b| stored_len + 4 <= opt_lenb && b.len() <= 0xffff) {
            log::debug!("deflate: stored block, {} bytes", stored_len);
            out.send_bits((STORED_BLOCK << 1) + eof as u32, 3)?;
            self.compressed_len = (self.compressed_len + 3 + 7) & !7;
            self.compressed_len += (stored_len + 4) << 3;
            out.copy_block(buf, true)?;
        } else if static_lenb == opt_lenb {
            log::debug!("deflate: static block, {} literals", self.last_lit);
            out.send_bits((STATIC_TREES << 1) + eof as u32, 3)?;
            self.compress_block(&self.static_ltree, &self.static_dtree, out)?;
            self.compressed_len += 3 + self.heap.static_len as u64;
        } else {
            log::debug!(
                "deflate: dynamic block, {} literals, {} bytes",
                self.last_lit,
                opt_lenb
            );
            out.send_bits((DYN_TREES << 1) + eof as u32, 3)?;
            self.send_all_trees(self.l_max_code + 1, self.d_max_code + 1, max_blindex + 1, out)?;
            self.compress_block(&self.dyn_ltree, &self.dyn_dtree, out)?;
            self.compressed_len += 3 + self.heap.opt_len as u64;
        }

        self.init_block();

        if eof {
            out.windup()?;
            self.compressed_len += 7;
        }
        Ok(self.compressed_len >> 3)
    }
}
