//! Bit-level I/O shared by every engine.
//!
//! [`InputCursor`] is the pull side: it owns a refill buffer that is topped
//! up from any [`Read`] source and a 64-bit accumulator from which decoders
//! take variable-width codes. [`BitWriter`] is the push side used by the
//! DEFLATE encoder: a 16-bit accumulator that spills whole words into a
//! staging buffer, which is written to any [`Write`] destination.
//!
//! # Bit Ordering
//!
//! DEFLATE, Shrink and Reduce all pack bits LSB-first: the first bit of a
//! field is the least significant bit of the first byte it touches.
//!
//! # Example
//!
//! ```
//! use pkcodec_core::bitstream::{BitWriter, InputCursor};
//!
//! let mut output = Vec::new();
//! let mut writer = BitWriter::new(&mut output);
//! writer.send_bits(0b101, 3).unwrap();
//! writer.send_bits(0x1ff, 9).unwrap();
//! writer.finish().unwrap();
//! drop(writer);
//!
//! let mut cursor = InputCursor::new(output.as_slice());
//! assert_eq!(cursor.read_bits(3).unwrap(), 0b101);
//! assert_eq!(cursor.read_bits(9).unwrap(), 0x1ff);
//! ```

use crate::error::{CodecError, Result};
use std::io::{self, Read, Write};

/// Default size of the input refill buffer.
pub const INPUT_BUFFER_SIZE: usize = 16 * 1024;

/// Default size of the encoder's staging buffer.
pub const OUTPUT_BUFFER_SIZE: usize = 16 * 1024;

/// Width of the encoder's bit accumulator.
const BUF_SIZE: u32 = 16;

/// Reverse the low `len` bits (1-16) of `code`.
///
/// Huffman codes are defined MSB-first but packed LSB-first, so the
/// encoder stores every code bit-reversed.
#[inline]
pub fn bi_reverse(code: u32, len: u32) -> u32 {
    debug_assert!(len > 0 && len <= 16);
    code.reverse_bits() >> (32 - len)
}

/// Outcome latched by the first refill that could not deliver data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latched {
    /// The source reported end of stream.
    Eof,
    /// The source failed.
    Failed(io::ErrorKind),
}

/// Pull-based input cursor with a bit accumulator.
///
/// Bytes come from the refill buffer, which is reloaded from the wrapped
/// reader whenever it runs dry. The first end-of-stream or read failure is
/// latched: later refills report the same outcome without calling the
/// reader again, so a decoder never mixes bits from a failed source with
/// fresh data.
///
/// Decoders follow a fill/peek/dump discipline: [`fill`](Self::fill)
/// loads as many bits as are available (up to the request),
/// [`peek`](Self::peek) looks at them (zero-padded past the end of input),
/// and [`dump`](Self::dump) consumes them, failing if more bits would be
/// consumed than were actually verified present.
#[derive(Debug)]
pub struct InputCursor<R: Read> {
    /// Underlying reader (the refill callback).
    reader: R,
    /// Refill buffer.
    buffer: Vec<u8>,
    /// Next unread byte in `buffer`.
    next: usize,
    /// End of valid data in `buffer`.
    end: usize,
    /// Bit accumulator (LSB-first).
    bit_buf: u64,
    /// Number of valid bits in `bit_buf`.
    bit_count: u32,
    /// Total bits consumed by the decoder.
    bits_consumed: u64,
    /// Sticky refill outcome.
    latched: Option<Latched>,
}

impl<R: Read> InputCursor<R> {
    /// Create a cursor with the default refill buffer size.
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, INPUT_BUFFER_SIZE)
    }

    /// Create a cursor with a refill buffer of `size` bytes (at least 1).
    pub fn with_buffer_size(reader: R, size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0; size.max(1)],
            next: 0,
            end: 0,
            bit_buf: 0,
            bit_count: 0,
            bits_consumed: 0,
            latched: None,
        }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consume the cursor and return the underlying reader.
    ///
    /// Bytes already pulled into the refill buffer but not consumed are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Total bits consumed so far.
    pub fn bit_position(&self) -> u64 {
        self.bits_consumed
    }

    /// Compressed bytes consumed so far (a partially used byte counts).
    pub fn bytes_consumed(&self) -> u64 {
        self.bits_consumed.div_ceil(8)
    }

    /// Number of bits currently held in the accumulator.
    pub fn bits_available(&self) -> u32 {
        self.bit_count
    }

    /// Whether the source has reported end of stream.
    pub fn is_exhausted(&self) -> bool {
        self.latched == Some(Latched::Eof) && self.next == self.end
    }

    /// Reload the refill buffer. Returns `Ok(false)` at end of stream.
    fn refill(&mut self) -> Result<bool> {
        match self.latched {
            Some(Latched::Eof) => return Ok(false),
            Some(Latched::Failed(kind)) => return Err(CodecError::input(io::Error::from(kind))),
            None => {}
        }

        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.latched = Some(Latched::Eof);
                    return Ok(false);
                }
                Ok(n) => {
                    self.next = 0;
                    self.end = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("input refill failed: {e}");
                    self.latched = Some(Latched::Failed(e.kind()));
                    return Err(CodecError::input(e));
                }
            }
        }
    }

    /// Next raw byte from the refill buffer, bypassing the accumulator.
    ///
    /// Returns `Ok(None)` at end of stream.
    #[inline]
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.next == self.end && !self.refill()? {
            return Ok(None);
        }
        let byte = self.buffer[self.next];
        self.next += 1;
        Ok(Some(byte))
    }

    /// Load bytes until at least `count` bits are buffered.
    ///
    /// Returns `Ok(false)` if the input ended first; the bits that did
    /// arrive stay in the accumulator. Read failures are errors.
    #[inline]
    pub fn fill(&mut self, count: u32) -> Result<bool> {
        debug_assert!(count <= 32, "Cannot fill more than 32 bits at once");
        while self.bit_count < count {
            match self.next_byte()? {
                Some(byte) => {
                    self.bit_buf |= (byte as u64) << self.bit_count;
                    self.bit_count += 8;
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Ensure `count` bits are buffered, failing at end of input.
    #[inline]
    pub fn need_bits(&mut self, count: u32) -> Result<()> {
        if self.fill(count)? {
            Ok(())
        } else {
            Err(CodecError::unexpected_eof(self.bits_consumed))
        }
    }

    /// Look at the next `count` bits without consuming them.
    ///
    /// Bits past the end of input read as zero.
    #[inline]
    pub fn peek(&self, count: u32) -> u32 {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");
        (self.bit_buf & ((1u64 << count) - 1)) as u32
    }

    /// Consume `count` bits that were previously filled.
    #[inline]
    pub fn dump(&mut self, count: u32) -> Result<()> {
        if count > self.bit_count {
            return Err(CodecError::unexpected_eof(self.bits_consumed));
        }
        self.bit_buf >>= count;
        self.bit_count -= count;
        self.bits_consumed += count as u64;
        Ok(())
    }

    /// Read `count` bits (0-32), first bit in the LSB.
    #[inline]
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        if count == 0 {
            return Ok(0);
        }
        self.need_bits(count)?;
        let value = self.peek(count);
        self.dump(count)?;
        Ok(value)
    }

    /// Discard bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let remainder = self.bit_count % 8;
        self.bit_buf >>= remainder;
        self.bit_count -= remainder;
        self.bits_consumed += remainder as u64;
    }

    /// Take up to `max` raw bytes straight from the refill buffer.
    ///
    /// The accumulator must be empty (byte-aligned and drained). Returns
    /// an empty slice only when `max` is zero; end of input is an error.
    pub fn take_bytes(&mut self, max: usize) -> Result<&[u8]> {
        debug_assert_eq!(self.bit_count, 0, "accumulator must be drained");
        if max == 0 {
            return Ok(&[]);
        }
        if self.next == self.end && !self.refill()? {
            return Err(CodecError::unexpected_eof(self.bits_consumed));
        }
        let len = max.min(self.end - self.next);
        let start = self.next;
        self.next += len;
        self.bits_consumed += len as u64 * 8;
        Ok(&self.buffer[start..start + len])
    }
}

/// Push-based bit writer with DEFLATE's 16-bit accumulator.
///
/// Whenever a field does not fit in the room left in the accumulator, the
/// full 16-bit word is spilled to the staging buffer. Staged bytes reach the
/// wrapped writer when the buffer fills and on [`finish`](Self::finish).
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer (the write callback).
    writer: W,
    /// Staged output bytes.
    staged: Vec<u8>,
    /// Staging threshold.
    capacity: usize,
    /// Bit accumulator; only the low 16 bits are significant.
    bi_buf: u32,
    /// Number of valid bits in `bi_buf`.
    bi_valid: u32,
    /// Total bits sent, including padding added by windup.
    bits_sent: u64,
    /// Bytes handed to the writer.
    bytes_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer with the default staging buffer size.
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, OUTPUT_BUFFER_SIZE)
    }

    /// Create a writer that stages up to `capacity` bytes.
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            writer,
            staged: Vec::with_capacity(capacity + 2),
            capacity,
            bi_buf: 0,
            bi_valid: 0,
            bits_sent: 0,
            bytes_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume this writer and return the underlying writer.
    ///
    /// Call [`finish`](Self::finish) first; staged bytes are not written.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Total bits sent so far.
    pub fn bits_sent(&self) -> u64 {
        self.bits_sent
    }

    /// Bytes handed to the underlying writer so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Send `length` bits (1-16) of `value`, LSB first.
    #[inline]
    pub fn send_bits(&mut self, value: u32, length: u32) -> Result<()> {
        debug_assert!(length > 0 && length <= BUF_SIZE, "invalid length");
        debug_assert!(value < (1 << length), "value wider than length");
        self.bits_sent += length as u64;

        if self.bi_valid > BUF_SIZE - length {
            self.bi_buf |= value << self.bi_valid;
            let word = self.bi_buf as u16;
            self.put_short(word)?;
            self.bi_buf = value >> (BUF_SIZE - self.bi_valid);
            self.bi_valid += length - BUF_SIZE;
        } else {
            self.bi_buf |= value << self.bi_valid;
            self.bi_valid += length;
        }
        Ok(())
    }

    /// Flush the accumulator to a byte boundary.
    pub fn windup(&mut self) -> Result<()> {
        if self.bi_valid > 8 {
            let word = self.bi_buf as u16;
            self.put_short(word)?;
        } else if self.bi_valid > 0 {
            let byte = self.bi_buf as u8;
            self.put_byte(byte)?;
        }
        self.bi_buf = 0;
        self.bi_valid = 0;
        self.bits_sent = (self.bits_sent + 7) & !7;
        Ok(())
    }

    /// Write a stored block: windup, optional `LEN`/`NLEN`, raw bytes.
    pub fn copy_block(&mut self, buf: &[u8], header: bool) -> Result<()> {
        self.windup()?;
        if header {
            debug_assert!(buf.len() <= 0xffff, "stored block too long");
            let len = buf.len() as u16;
            self.put_short(len)?;
            self.put_short(!len)?;
            self.bits_sent += 2 * 16;
        }
        self.put_bytes(buf)?;
        self.bits_sent += buf.len() as u64 * 8;
        Ok(())
    }

    /// Windup, write staged bytes and flush the underlying writer.
    pub fn finish(&mut self) -> Result<()> {
        self.windup()?;
        self.flush_staged()?;
        self.writer.flush().map_err(CodecError::output)
    }

    #[inline]
    fn put_short(&mut self, word: u16) -> Result<()> {
        self.staged.extend_from_slice(&word.to_le_bytes());
        if self.staged.len() >= self.capacity {
            self.flush_staged()?;
        }
        Ok(())
    }

    #[inline]
    fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.staged.push(byte);
        if self.staged.len() >= self.capacity {
            self.flush_staged()?;
        }
        Ok(())
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.staged.len() + bytes.len() < self.capacity {
            self.staged.extend_from_slice(bytes);
            return Ok(());
        }
        self.flush_staged()?;
        self.writer.write_all(bytes).map_err(|e| {
            log::warn!("output write failed: {e}");
            CodecError::output(e)
        })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn flush_staged(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        self.writer.write_all(&self.staged).map_err(|e| {
            log::warn!("output write failed: {e}");
            CodecError::output(e)
        })?;
        self.bytes_written += self.staged.len() as u64;
        self.staged.clear();
        Ok(())
    }
}
