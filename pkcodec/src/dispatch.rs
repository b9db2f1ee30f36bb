//! Method dispatch.
//!
//! Maps a PKZIP method id to the engine that handles it. Every engine
//! pulls from a [`Read`] and pushes to a [`Write`]; the archive layer only
//! picks the method and supplies the entry's uncompressed size.

use pkcodec_core::bitstream::InputCursor;
use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::method::Method;
use pkcodec_core::traits::DecodeSummary;
use pkcodec_core::window::{OutputWindow, sizes};
use pkcodec_deflate::{DeflateOptions, DeflateSummary, InflateVariant, Inflater, deflate_stream};
use pkcodec_legacy::{ReduceFactor, Unreducer, Unshrinker};
use std::io::{Read, Write};

/// Whether [`decompress`] has an engine for `method`.
pub fn is_supported(method: Method) -> bool {
    matches!(
        method,
        Method::Stored
            | Method::Shrunk
            | Method::Reduced1
            | Method::Reduced2
            | Method::Reduced3
            | Method::Reduced4
            | Method::Deflated
            | Method::Deflate64
    )
}

/// Decompress one entry's data with the engine for `method`.
///
/// `uncompressed_size` bounds the output of the formats without an end
/// marker (Stored, Shrunk, Reduced). DEFLATE and DEFLATE64 streams end
/// at their final block and ignore it.
///
/// # Errors
///
/// [`CodecError::UnsupportedMethod`] for Implode and unknown ids; any
/// engine error otherwise.
pub fn decompress<R: Read, W: Write>(
    method: Method,
    input: R,
    output: W,
    uncompressed_size: u64,
) -> Result<DecodeSummary> {
    log::debug!(
        "decompress: method {} ({}), {} bytes expected",
        method.id(),
        method,
        uncompressed_size
    );

    match method {
        Method::Stored => copy_stored(input, output, uncompressed_size),
        Method::Shrunk => {
            Unshrinker::with_expected_size(uncompressed_size).unshrink_stream(input, output)
        }
        Method::Reduced1 | Method::Reduced2 | Method::Reduced3 | Method::Reduced4 => {
            let factor = ReduceFactor::from_method(method)
                .ok_or_else(|| CodecError::unsupported_method(method.to_string()))?;
            Unreducer::new(factor, uncompressed_size).unreduce_stream(input, output)
        }
        Method::Deflated => Inflater::new().inflate_stream(input, output),
        Method::Deflate64 => {
            Inflater::with_variant(InflateVariant::Deflate64).inflate_stream(input, output)
        }
        Method::Imploded | Method::Unknown(_) => {
            Err(CodecError::unsupported_method(method.to_string()))
        }
    }
}

/// Decompress an in-memory entry.
pub fn decompress_to_vec(method: Method, data: &[u8], uncompressed_size: u64) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    output.try_reserve(usize::try_from(uncompressed_size).unwrap_or(0).min(1 << 24))?;
    decompress(method, data, &mut output, uncompressed_size)?;
    Ok(output)
}

/// Compress `input` into `output` with DEFLATE.
///
/// With [`DeflateOptions::allow_stored_file`] set, the summary may report
/// [`Method::Stored`]; `output` then holds the input verbatim and the
/// entry must be recorded as stored.
pub fn compress<R: Read, W: Write>(
    input: R,
    output: W,
    options: DeflateOptions,
) -> Result<DeflateSummary> {
    let summary = deflate_stream(input, output, options)?;
    log::debug!(
        "compress: {} -> {} bytes as {}",
        summary.bytes_in,
        summary.compressed_len,
        summary.method
    );
    Ok(summary)
}

/// Copy exactly `size` bytes, computing their CRC on the way.
fn copy_stored<R: Read, W: Write>(input: R, output: W, size: u64) -> Result<DecodeSummary> {
    let mut cursor = InputCursor::new(input);
    let mut window = OutputWindow::new(output, sizes::DEFLATE)?;

    let mut remaining = size;
    while remaining > 0 {
        let want = usize::try_from(remaining).unwrap_or(usize::MAX);
        let chunk = cursor.take_bytes(want)?;
        remaining -= chunk.len() as u64;
        window.put_slice(chunk)?;
    }
    window.finish()?;

    Ok(DecodeSummary {
        bytes_in: cursor.bytes_consumed(),
        bytes_out: window.total_out(),
        crc32: window.crc32(),
    })
}
