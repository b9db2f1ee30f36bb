//! Unshrink and Unreduce integration tests.

use pkcodec_core::bitstream::BitWriter;
use pkcodec_core::crc::Crc32;
use pkcodec_core::traits::Decoder;
use pkcodec_legacy::{ReduceFactor, Unreducer, Unshrinker, unreduce, unshrink};
use std::collections::HashMap;

const ESCAPE: u32 = 256;
const DLE: u8 = 0x90;

/// Pack `(code, bits)` pairs LSB first.
fn pack(codes: &[(u32, u32)]) -> Vec<u8> {
    let mut writer = BitWriter::new(Vec::new());
    for &(code, bits) in codes {
        writer.send_bits(code, bits).unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner()
}

fn emit(writer: &mut BitWriter<Vec<u8>>, code: u32, bits: &mut u32) {
    while code >= 1 << *bits {
        writer.send_bits(ESCAPE, *bits).unwrap();
        writer.send_bits(1, *bits).unwrap();
        *bits += 1;
    }
    writer.send_bits(code, *bits).unwrap();
}

/// Minimal Shrink encoder without partial clears.
///
/// Grows the code width just before the first code that needs it. Once
/// all 8192 codes are assigned it keeps coding with the table as is.
/// Returns the stream and the next code it would have assigned.
fn shrink_with_table(data: &[u8]) -> (Vec<u8>, u32) {
    let mut writer = BitWriter::new(Vec::new());
    let mut table: HashMap<(u32, u8), u32> = HashMap::new();
    let mut next_code = 257u32;
    let mut bits = 9u32;

    let Some((&first, rest)) = data.split_first() else {
        return (Vec::new(), next_code);
    };
    let mut w = first as u32;
    for &c in rest {
        if let Some(&code) = table.get(&(w, c)) {
            w = code;
            continue;
        }
        emit(&mut writer, w, &mut bits);
        if next_code < 8192 {
            table.insert((w, c), next_code);
            next_code += 1;
        }
        w = c as u32;
    }
    emit(&mut writer, w, &mut bits);
    writer.finish().unwrap();
    (writer.into_inner(), next_code)
}

fn shrink(data: &[u8]) -> Vec<u8> {
    shrink_with_table(data).0
}

/// Words drawn from a small vocabulary.
fn text(size: usize) -> Vec<u8> {
    let words: [&[u8]; 8] = [
        b"shrink ", b"reduce ", b"implode ", b"deflate ", b"method ", b"entry ", b"archive ",
        b"header\n",
    ];
    let mut data = Vec::with_capacity(size + 16);
    let mut seed: u64 = 7;
    while data.len() < size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.extend_from_slice(words[(seed >> 33) as usize % words.len()]);
    }
    data.truncate(size);
    data
}

/// Reduce stream with every follower set empty, then `bytes` raw.
fn reduce_raw(bytes: &[u8]) -> Vec<u8> {
    let mut codes = vec![(0u32, 6u32); 256];
    codes.extend(bytes.iter().map(|&b| (b as u32, 8)));
    pack(&codes)
}

#[test]
fn test_unshrink_partial_clear_vector() {
    let codes = [65, 66, 257, 67, ESCAPE, 2, 68, 257, 258, 259];
    let data = pack(&codes.iter().map(|&c| (c, 9)).collect::<Vec<_>>());
    assert_eq!(unshrink(&data).unwrap(), b"ABABCDABCDDA");
}

#[test]
fn test_unshrink_code_width_growth() {
    let data = pack(&[(65, 9), (ESCAPE, 9), (1, 9), (66, 10), (257, 10)]);
    assert_eq!(unshrink(&data).unwrap(), b"ABAB");
}

#[test]
fn test_unshrink_width_past_thirteen() {
    let mut codes = vec![(65, 9)];
    for bits in 9..=13 {
        codes.push((ESCAPE, bits));
        codes.push((1, bits));
    }
    let err = unshrink(&pack(&codes)).unwrap_err();
    assert_eq!(err.code(), 2);
}

#[test]
fn test_unshrink_encoded_text() {
    let original = text(20_000);
    let packed = shrink(&original);
    assert!(packed.len() < original.len() / 2);

    let mut out = Vec::new();
    let summary = Unshrinker::new()
        .unshrink_stream(&packed[..], &mut out)
        .unwrap();
    assert_eq!(out, original);
    assert_eq!(summary.bytes_out, original.len() as u64);
    assert_eq!(summary.crc32, Crc32::compute(&original));
}

#[test]
fn test_unshrink_keeps_decoding_with_full_table() {
    let mut seed: u64 = 0xC0FFEE;
    let original: Vec<u8> = (0..200_000)
        .map(|_| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            b"ACGT"[(seed >> 33) as usize % 4]
        })
        .collect();
    let (packed, next_code) = shrink_with_table(&original);
    assert_eq!(next_code, 8192);

    let mut out = Vec::new();
    let summary = Unshrinker::new()
        .unshrink_stream(&packed[..], &mut out)
        .unwrap();
    assert_eq!(out, original);
    assert_eq!(summary.crc32, Crc32::compute(&original));
}

#[test]
fn test_unshrink_repeated_byte() {
    // Long runs exercise the not-yet-defined code path at every step.
    let original = vec![b'z'; 5000];
    let packed = shrink(&original);
    assert_eq!(unshrink(&packed).unwrap(), original);
}

#[test]
fn test_unshrink_expected_size_stops_early() {
    let original = text(4000);
    let packed = shrink(&original);
    let out = Unshrinker::with_expected_size(1000)
        .decode_all(&packed)
        .unwrap();
    assert_eq!(out, &original[..1000]);
}

#[test]
fn test_unshrink_output_error() {
    struct Refuse;
    impl std::io::Write for Refuse {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let packed = shrink(&text(1000));
    let err = Unshrinker::new()
        .unshrink_stream(&packed[..], Refuse)
        .unwrap_err();
    assert_eq!(err.code(), 5);
}

#[test]
fn test_unreduce_max_distance_each_factor() {
    for factor in 1..=4 {
        let factor = ReduceFactor::new(factor).unwrap();
        let max = factor.max_distance();
        let prefix: Vec<u8> = (0..max).map(|i| (i % 97) as u8).collect();

        let mut bytes = prefix.clone();
        bytes.extend_from_slice(&[DLE, factor.d_mask() << factor.d_shift(), 0xff]);
        let out = unreduce(&reduce_raw(&bytes), factor, max as u64 + 3).unwrap();

        assert_eq!(&out[..max], &prefix[..], "factor {}", factor.factor());
        assert_eq!(&out[max..], &prefix[..3], "factor {}", factor.factor());
    }
}

#[test]
fn test_unreduce_longest_match_each_factor() {
    for factor in 1..=4 {
        let factor = ReduceFactor::new(factor).unwrap();
        let length = factor.l_mask() as usize + 255 + 3;

        let bytes = [b'k', DLE, factor.l_mask(), 255, 0];
        let out = unreduce(&reduce_raw(&bytes), factor, 1 + length as u64).unwrap();
        assert_eq!(out, vec![b'k'; 1 + length], "factor {}", factor.factor());
    }
}

#[test]
fn test_unreduce_summary() {
    let bytes = [b'a', b'b', b'c', DLE, 3, 2];
    let data = reduce_raw(&bytes);
    let mut out = Vec::new();
    let summary = Unreducer::new(ReduceFactor::ONE, 9)
        .unreduce_stream(&data[..], &mut out)
        .unwrap();
    assert_eq!(summary.bytes_out, 9);
    assert_eq!(summary.bytes_in, data.len() as u64);
    assert_eq!(summary.crc32, Crc32::compute(b"abcabcabc"));
}

#[test]
fn test_unreduce_match_spans_window_flush() {
    // 0x4000-byte window: a match straddling the flush still copies history.
    let prefix: Vec<u8> = (0..0x4000 - 2).map(|i| (i % 13) as u8).collect();
    let mut bytes = prefix.clone();
    // Factor 4, length 3 + 3, distance 13.
    bytes.extend_from_slice(&[DLE, 0x03, 12]);
    let out = unreduce(&reduce_raw(&bytes), ReduceFactor::FOUR, prefix.len() as u64 + 6).unwrap();

    let mut expected = prefix.clone();
    for _ in 0..6 {
        expected.push(expected[expected.len() - 13]);
    }
    assert_eq!(out, expected);
}
