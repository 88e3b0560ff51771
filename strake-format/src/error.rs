//! Error types for the segment file format

use thiserror::Error;

/// Errors arising from decoding or validating the on-disk format itself.
///
/// These are the "Corruption" and low-level "I/O" kinds named in the format
/// design: a segment that fails any of these checks is abandoned entirely,
/// with no attempt at resynchronization.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The segment header's magic bytes did not match.
    #[error("invalid segment magic")]
    InvalidMagic,
    /// A varint ran past the 10-byte ceiling for a u64 without terminating.
    #[error("varint too long")]
    VarintTooLong,
    /// A varint or block ran out of bytes before it could be fully read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A run's `shared_prefix_len` exceeded the length of the previous
    /// non-null value it was supposed to share a prefix with.
    #[error("shared prefix length {shared} exceeds previous value length {prev_len}")]
    SharedPrefixTooLong {
        /// The `shared_prefix_len` that was read.
        shared: usize,
        /// The length of the previously reconstructed non-null value.
        prev_len: usize,
    },
    /// A segment's declared column count did not match the number of column
    /// descriptors actually present.
    #[error("column descriptor count mismatch: header said {declared}, found {found}")]
    ColumnCountMismatch {
        /// Count declared in the segment header.
        declared: usize,
        /// Count actually present.
        found: usize,
    },
    /// The codec tag stored in a segment is not one this crate understands.
    #[error("unknown codec tag: {0}")]
    UnknownCodec(u8),
    /// Decompression produced a different number of bytes than the segment
    /// declared, or failed outright.
    #[error("decompression failed: {0}")]
    DecompressError(String),
    /// A value exceeded one of the defensive limits in [`crate::limits::Limits`].
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// Lower-level I/O failure reading or writing the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for format-level operations.
pub type Result<T> = std::result::Result<T, FormatError>;
