//! Output window (sliding dictionary) for the decoders.
//!
//! [`OutputWindow`] is the push-based sink shared by Inflate, Unshrink and
//! Unreduce. Decoded bytes accumulate in a circular window that doubles as
//! the LZ77 history; each time the window fills, its contents are handed to
//! the destination writer (the flush callback) and the write position wraps
//! to zero, leaving the old bytes in place as history.
//!
//! # Sizes
//!
//! - DEFLATE: 32 KB
//! - DEFLATE64: 64 KB
//! - Shrink: 32 KB (plain output buffer, no history needed)
//! - Reduce: 16 KB (distances never exceed 4 KB)

use crate::crc::Crc32;
use crate::error::{CodecError, Result};
use std::io::Write;

/// Window sizes for the supported methods.
pub mod sizes {
    /// Window size for DEFLATE (32 KB).
    pub const DEFLATE: usize = 0x8000;
    /// Window size for DEFLATE64 (64 KB).
    pub const DEFLATE64: usize = 0x10000;
    /// Output buffer size for Shrink (32 KB).
    pub const SHRINK: usize = 0x8000;
    /// Window size for Reduce (16 KB).
    pub const REDUCE: usize = 0x4000;
}

/// Copy `len` bytes inside `buf` from `src` to `dst`, LZ77 style.
///
/// When the destination starts inside the source run (`src < dst < src +
/// len`), bytes are copied one at a time so that freshly written bytes are
/// read back, repeating the pattern. Otherwise the ranges cannot feed each
/// other and a bulk `copy_within` is used.
///
/// # Panics
///
/// Panics if either range is out of bounds.
#[inline]
pub fn overlap_copy(buf: &mut [u8], src: usize, dst: usize, len: usize) {
    if dst > src && dst - src < len {
        for i in 0..len {
            buf[dst + i] = buf[src + i];
        }
    } else {
        buf.copy_within(src..src + len, dst);
    }
}

/// Circular output window with a flush-on-full writer.
///
/// The window is owned by exactly one decoder for the lifetime of a stream.
/// A running CRC-32 is kept over every byte handed to the writer.
#[derive(Debug)]
pub struct OutputWindow<W: Write> {
    /// Destination (the flush callback).
    sink: W,
    /// Window storage.
    slide: Vec<u8>,
    /// Next write position.
    pos: usize,
    /// `slide.len() - 1`.
    mask: usize,
    /// Bytes produced so far.
    total: u64,
    /// Whether the window has been flushed (and wrapped) at least once.
    wrapped: bool,
    /// CRC of flushed bytes.
    crc: Crc32,
}

impl<W: Write> OutputWindow<W> {
    /// Create a window of `size` bytes (rounded up to a power of two).
    ///
    /// Allocation failure is reported as [`CodecError::OutOfMemory`].
    pub fn new(sink: W, size: usize) -> Result<Self> {
        let size = size.max(2).next_power_of_two();
        let mut slide = Vec::new();
        slide.try_reserve_exact(size)?;
        slide.resize(size, 0);
        Ok(Self {
            sink,
            slide,
            pos: 0,
            mask: size - 1,
            total: 0,
            wrapped: false,
            crc: Crc32::new(),
        })
    }

    /// Window size in bytes.
    pub fn capacity(&self) -> usize {
        self.slide.len()
    }

    /// Bytes produced so far (flushed or pending).
    pub fn total_out(&self) -> u64 {
        self.total
    }

    /// Bytes written to the window but not yet flushed.
    pub fn pending(&self) -> usize {
        self.pos
    }

    /// CRC-32 of the bytes flushed so far.
    pub fn crc32(&self) -> u32 {
        self.crc.finalize()
    }

    /// Get a reference to the destination.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Consume the window and return the destination.
    ///
    /// Call [`finish`](Self::finish) first; pending bytes are dropped.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Append one byte.
    #[inline]
    pub fn put(&mut self, byte: u8) -> Result<()> {
        self.slide[self.pos] = byte;
        self.pos += 1;
        self.total += 1;
        if self.pos == self.slide.len() {
            self.flush_window()?;
        }
        Ok(())
    }

    /// Append a run of bytes.
    pub fn put_slice(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let room = self.slide.len() - self.pos;
            let take = room.min(bytes.len());
            self.slide[self.pos..self.pos + take].copy_from_slice(&bytes[..take]);
            self.pos += take;
            self.total += take as u64;
            bytes = &bytes[take..];
            if self.pos == self.slide.len() {
                self.flush_window()?;
            }
        }
        Ok(())
    }

    /// Copy `length` bytes starting `distance` bytes back.
    ///
    /// A distance of zero, beyond the window, or before the first byte of
    /// output is rejected.
    pub fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        let history = self.total.min(self.slide.len() as u64) as usize;
        if distance == 0 || distance > history {
            return Err(CodecError::invalid_distance(distance, history));
        }
        self.copy_back(distance, length, false)
    }

    /// Copy `length` bytes starting `distance` bytes back, where positions
    /// before the start of output read as zero bytes.
    ///
    /// `distance` must be in `1..=capacity`.
    pub fn copy_match_zero_fill(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance == 0 || distance > self.slide.len() {
            return Err(CodecError::invalid_distance(distance, self.slide.len()));
        }
        self.copy_back(distance, length, true)
    }

    fn copy_back(&mut self, distance: usize, length: usize, zero_fill: bool) -> Result<()> {
        let size = self.slide.len();
        let mut src = (self.pos + size - distance) & self.mask;
        let mut remaining = length;

        while remaining > 0 {
            let run = (size - src.max(self.pos)).min(remaining);
            if zero_fill && !self.wrapped && self.pos <= src {
                self.slide[self.pos..self.pos + run].fill(0);
            } else {
                overlap_copy(&mut self.slide, src, self.pos, run);
            }
            self.pos += run;
            self.total += run as u64;
            src = (src + run) & self.mask;
            remaining -= run;
            if self.pos == size {
                self.flush_window()?;
            }
        }
        Ok(())
    }

    /// Hand the filled part of the window to the destination.
    fn flush_window(&mut self) -> Result<()> {
        if self.pos == 0 {
            return Ok(());
        }
        let filled = &self.slide[..self.pos];
        self.crc.update(filled);
        self.sink.write_all(filled).map_err(|e| {
            log::warn!("output flush of {} bytes failed: {e}", filled.len());
            CodecError::output(e)
        })?;
        self.pos = 0;
        self.wrapped = true;
        Ok(())
    }

    /// Flush pending bytes and the destination itself.
    pub fn finish(&mut self) -> Result<()> {
        self.flush_window()?;
        self.sink.flush().map_err(CodecError::output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn naive_copy(buf: &mut [u8], src: usize, dst: usize, len: usize) {
        for i in 0..len {
            buf[dst + i] = buf[src + i];
        }
    }

    /// Writer that accepts a fixed number of bytes, then fails.
    struct Limited(usize);

    impl Write for Limited {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "full"));
            }
            self.0 -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_overlap_copy_matches_byte_loop() {
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let src = (seed >> 8) as usize % 64;
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let gap = 1 + (seed >> 8) as usize % 40;
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let len = 1 + (seed >> 8) as usize % 120;
            let dst = src + gap;

            let mut expected: Vec<u8> = (0..256).map(|i| (i * 7) as u8).collect();
            let mut actual = expected.clone();
            naive_copy(&mut expected, src, dst, len);
            overlap_copy(&mut actual, src, dst, len);
            assert_eq!(actual, expected, "src={src} dst={dst} len={len}");
        }
    }

    #[test]
    fn test_distance_one_run() {
        let mut out = Vec::new();
        let mut window = OutputWindow::new(&mut out, 64).unwrap();
        window.put(b'x').unwrap();
        window.copy_match(1, 100).unwrap();
        window.finish().unwrap();
        assert_eq!(window.total_out(), 101);
        drop(window);
        assert_eq!(out, vec![b'x'; 101]);
    }

    #[test]
    fn test_copy_across_wrap() {
        let mut out = Vec::new();
        let mut window = OutputWindow::new(&mut out, 16).unwrap();
        window.put_slice(b"0123456789abc").unwrap();
        window.copy_match(10, 10).unwrap();
        window.finish().unwrap();
        drop(window);
        assert_eq!(out, b"0123456789abc3456789abc".to_vec());
    }

    #[test]
    fn test_distance_before_start_rejected() {
        let mut out = Vec::new();
        let mut window = OutputWindow::new(&mut out, 32).unwrap();
        window.put_slice(b"ab").unwrap();
        let err = window.copy_match(3, 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidDistance {
                distance: 3,
                history_size: 2
            }
        ));
        assert!(window.copy_match(0, 2).is_err());
    }

    #[test]
    fn test_zero_fill_before_start() {
        let mut out = Vec::new();
        let mut window = OutputWindow::new(&mut out, 16).unwrap();
        window.put_slice(b"ab").unwrap();
        window.copy_match_zero_fill(4, 4).unwrap();
        window.finish().unwrap();
        drop(window);
        assert_eq!(out, vec![b'a', b'b', 0, 0, b'a', b'b']);
    }

    #[test]
    fn test_crc_of_flushed_bytes() {
        let mut out = Vec::new();
        let mut window = OutputWindow::new(&mut out, 4).unwrap();
        window.put_slice(b"123456789").unwrap();
        window.finish().unwrap();
        assert_eq!(window.crc32(), 0xCBF43926);
    }

    #[test]
    fn test_flush_failure_is_output_error() {
        let mut window = OutputWindow::new(Limited(4), 4).unwrap();
        window.put_slice(b"1234").unwrap();
        let err = window.put_slice(b"5678").unwrap_err();
        assert_eq!(err.code(), 5);
    }
}
