//! Error types for pkcodec operations.
//!
//! Every engine in the workspace (Inflate, Deflate, Unshrink, Unreduce)
//! reports failures through [`CodecError`]. Each variant belongs to an
//! [`ErrorKind`], and each kind carries a small numeric code so an archive
//! layer can map outcomes to its own diagnostics without matching on
//! individual variants.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Broad classification of a [`CodecError`].
///
/// The discriminants are the numeric codes returned by [`ErrorKind::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Incomplete or invalid Huffman code, or an undefined symbol.
    InvalidCode = 1,
    /// Malformed compressed data.
    BadData = 2,
    /// Allocation failure while building tables or windows.
    OutOfMemory = 3,
    /// The compressed (or raw) source failed or ended early.
    Input = 4,
    /// The destination rejected a flush.
    Output = 5,
    /// Compression level outside 0-9.
    BadLevel = 6,
    /// A block flush was requested without its backing buffer.
    BlockVanished = 7,
    /// No engine for the requested method.
    Unsupported = 8,
}

impl ErrorKind {
    /// Numeric code of this kind.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether the kind describes damaged input rather than an I/O or
    /// caller problem.
    pub fn is_corruption(self) -> bool {
        matches!(self, Self::InvalidCode | Self::BadData)
    }
}

/// The error type for pkcodec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The compressed source could not supply more bytes.
    #[error("Input error: {0}")]
    Input(#[source] io::Error),

    /// The destination failed to accept flushed bytes.
    #[error("Output error: {0}")]
    Output(#[source] io::Error),

    /// Input ended before a requested number of bits was available.
    #[error("Unexpected end of input at bit position {bit_position}")]
    UnexpectedEof {
        /// Bit position at which the input ran dry.
        bit_position: u64,
    },

    /// A Huffman code did not resolve to a valid symbol.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// A code set that must be complete left unused codes.
    #[error("Incomplete {table} code set")]
    IncompleteCode {
        /// Which table was incomplete.
        table: &'static str,
    },

    /// Code lengths describe more codes than the code space holds.
    #[error("Over-subscribed Huffman code lengths")]
    OversubscribedCode,

    /// Corrupted data in the compressed stream.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset (compressed input) where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Back-reference points before the start of the output.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The offending distance.
        distance: usize,
        /// Bytes of history available.
        history_size: usize,
    },

    /// Allocation failure.
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    /// Compression level outside 0-9.
    #[error("Bad pack level: {0}")]
    BadLevel(u8),

    /// The encoder lost the window contents of the block being flushed.
    #[error("Block vanished")]
    BlockVanished,

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },
}

/// Result type alias for pkcodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create an input error.
    pub fn input(err: io::Error) -> Self {
        Self::Input(err)
    }

    /// Create an output error.
    pub fn output(err: io::Error) -> Self {
        Self::Output(err)
    }

    /// Create an unexpected end of input error.
    pub fn unexpected_eof(bit_position: u64) -> Self {
        Self::UnexpectedEof { bit_position }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an incomplete code set error.
    pub fn incomplete(table: &'static str) -> Self {
        Self::IncompleteCode { table }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) | Self::UnexpectedEof { .. } => ErrorKind::Input,
            Self::Output(_) => ErrorKind::Output,
            Self::InvalidHuffmanCode { .. } | Self::IncompleteCode { .. } => {
                ErrorKind::InvalidCode
            }
            Self::OversubscribedCode
            | Self::CorruptedData { .. }
            | Self::InvalidDistance { .. } => ErrorKind::BadData,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Self::BadLevel(_) => ErrorKind::BadLevel,
            Self::BlockVanished => ErrorKind::BlockVanished,
            Self::UnsupportedMethod { .. } => ErrorKind::Unsupported,
        }
    }

    /// Numeric code of this error (see [`ErrorKind`]).
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::corrupted(12, "stored block length mismatch");
        assert!(err.to_string().contains("stored block length mismatch"));

        let err = CodecError::BadLevel(11);
        assert!(err.to_string().contains("Bad pack level"));

        let err = CodecError::unsupported_method("Imploded");
        assert!(err.to_string().contains("Imploded"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CodecError::incomplete("literal/length").code(), 1);
        assert_eq!(CodecError::invalid_huffman(0).code(), 1);
        assert_eq!(CodecError::OversubscribedCode.code(), 2);
        assert_eq!(CodecError::invalid_distance(5, 2).code(), 2);
        assert_eq!(CodecError::unexpected_eof(8).code(), 4);
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(CodecError::output(io_err).code(), 5);
        assert_eq!(CodecError::BadLevel(10).code(), 6);
        assert_eq!(CodecError::BlockVanished.code(), 7);
    }

    #[test]
    fn test_out_of_memory_conversion() {
        let mut v: Vec<u8> = Vec::new();
        let err: CodecError = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_corruption_classification() {
        assert!(ErrorKind::BadData.is_corruption());
        assert!(ErrorKind::InvalidCode.is_corruption());
        assert!(!ErrorKind::Input.is_corruption());
    }
}
