//! Dispatch tests across every supported method.

use pkcodec::{DeflateOptions, Method, compress, decompress, decompress_to_vec};
use pkcodec_core::bitstream::BitWriter;
use pkcodec_core::crc::Crc32;
use std::io::{self, Read};

fn lcg_bytes(len: usize, mut seed: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (seed >> 16) as u8
        })
        .collect()
}

fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
    let mut writer = BitWriter::new(Vec::new());
    for &(value, bits) in fields {
        writer.send_bits(value, bits).unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner()
}

/// Reader that fails after yielding its data once.
struct FailingReader<'a>(&'a [u8]);

impl Read for FailingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"));
        }
        let n = buf.len().min(self.0.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }
}

#[test]
fn test_shrunk_entry() {
    let codes = [65, 66, 257, 67, 256, 2, 68, 257, 258, 259];
    let data = pack(&codes.iter().map(|&c| (c, 9)).collect::<Vec<_>>());
    let out = decompress_to_vec(Method::from_u16(1), &data, 12).unwrap();
    assert_eq!(out, b"ABABCDABCDDA");
}

#[test]
fn test_shrunk_entry_clipped_to_size() {
    let data = pack(&[(65, 9), (66, 9), (257, 9)]);
    let out = decompress_to_vec(Method::Shrunk, &data, 3).unwrap();
    assert_eq!(out, b"ABA");
}

#[test]
fn test_reduced_entries() {
    // Empty follower sets, then "abc", DLE, V, distance byte.
    for (id, v) in [(2u16, 0x03u8), (3, 0x03), (4, 0x03), (5, 0x03)] {
        let mut fields = vec![(0u32, 6u32); 256];
        for byte in [b'a', b'b', b'c', 0x90, v, 2] {
            fields.push((byte as u32, 8));
        }
        let data = pack(&fields);
        let out = decompress_to_vec(Method::from_u16(id), &data, 9).unwrap();
        assert_eq!(out, b"abcabcabc", "method {}", id);
    }
}

#[test]
fn test_deflated_entry() {
    let data = lcg_bytes(20_000, 3);
    let mut packed = Vec::new();
    let summary = compress(&data[..], &mut packed, DeflateOptions::new(6).unwrap()).unwrap();

    let mut out = Vec::new();
    let decoded = decompress(Method::Deflated, &packed[..], &mut out, data.len() as u64).unwrap();
    assert_eq!(out, data);
    assert_eq!(decoded.crc32, summary.crc32);
    assert_eq!(decoded.bytes_in, summary.compressed_len);
}

#[test]
fn test_deflate64_entry_with_stored_blocks() {
    // Stored blocks read the same under both variants.
    let data = lcg_bytes(70_000, 11);
    let mut packed = Vec::new();
    compress(&data[..], &mut packed, DeflateOptions::new(0).unwrap()).unwrap();

    let out = decompress_to_vec(Method::Deflate64, &packed, data.len() as u64).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_deflate64_length_code_285() {
    // Fixed block: literal 'x' (0x30 + 'x' in 8 bits), code 285 with 16
    // extra bits = 1000 (length 1003), distance code 0, end of block.
    let mut writer = BitWriter::new(Vec::new());
    writer.send_bits(1, 1).unwrap();
    writer.send_bits(1, 2).unwrap();
    let lit = pkcodec_core::bi_reverse(0x30 + b'x' as u32, 8);
    writer.send_bits(lit, 8).unwrap();
    writer.send_bits(pkcodec_core::bi_reverse(0xc5, 8), 8).unwrap();
    writer.send_bits(1000, 16).unwrap();
    writer.send_bits(0, 5).unwrap();
    writer.send_bits(0, 7).unwrap();
    writer.finish().unwrap();
    let packed = writer.into_inner();

    let out = decompress_to_vec(Method::Deflate64, &packed, 1004).unwrap();
    assert_eq!(out, vec![b'x'; 1004]);
}

#[test]
fn test_stored_file_fallback_round_trip() {
    let data = lcg_bytes(600, 21);
    let mut packed = Vec::new();
    let options = DeflateOptions::new(9).unwrap().with_stored_file(true);
    let summary = compress(&data[..], &mut packed, options).unwrap();
    assert_eq!(summary.method, Method::Stored);

    let out = decompress_to_vec(summary.method, &packed, summary.bytes_in).unwrap();
    assert_eq!(out, data);
    assert_eq!(Crc32::compute(&out), summary.crc32);
}

#[test]
fn test_unsupported_methods() {
    for id in [6u16, 7, 12, 14, 93, 98] {
        let err = decompress_to_vec(Method::from_u16(id), &[0; 8], 8).unwrap_err();
        assert_eq!(err.code(), 8, "method {}", id);
    }
}

#[test]
fn test_reader_failure_is_input_error() {
    let data = pack(&[(65, 9), (66, 9), (257, 9)]);
    let err = decompress(Method::Shrunk, FailingReader(&data[..2]), Vec::new(), 100).unwrap_err();
    assert_eq!(err.code(), 4);

    let err = decompress(Method::Stored, FailingReader(b"abc"), Vec::new(), 10).unwrap_err();
    assert_eq!(err.code(), 4);
}
