//! Core primitives for the segment file format, with no I/O dependencies.
//!
//! This crate provides:
//!
//! - Wire constants (segment magic, codec tags)
//! - Variable-length integer encoding (ULEB128 / ZigZag)
//! - The segment header: codec tag + column descriptor table
//! - Error types
//! - Defensive size limits for untrusted input

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod limits;
pub mod segment;
pub mod varint;

pub use error::{FormatError, Result};
pub use limits::Limits;
pub use segment::{ColumnDescriptor, SegmentHeader};

/// The five codec tags this format recognizes, named for the select-engine
/// and writer APIs that pick a default at construction time. Wire encoding
/// is the raw `u8` tag (see [`constants`]); this enum is a convenience for
/// callers who would rather not remember the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecTag {
    /// No compression; the field block is the raw encoding stream.
    None,
    /// Snappy block compression.
    Snappy,
    /// LZ4 block compression.
    Lz4,
    /// LZMA block compression.
    Lzma,
    /// zlib (DEFLATE) block compression.
    Zlib,
}

impl CodecTag {
    /// The wire byte for this codec.
    pub fn tag(&self) -> u8 {
        match self {
            CodecTag::None => constants::CODEC_NONE,
            CodecTag::Snappy => constants::CODEC_SNAPPY,
            CodecTag::Lz4 => constants::CODEC_LZ4,
            CodecTag::Lzma => constants::CODEC_LZMA,
            CodecTag::Zlib => constants::CODEC_ZLIB,
        }
    }

    /// Resolve a wire byte to a known codec tag, or `None` if unrecognized.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            constants::CODEC_NONE => Some(CodecTag::None),
            constants::CODEC_SNAPPY => Some(CodecTag::Snappy),
            constants::CODEC_LZ4 => Some(CodecTag::Lz4),
            constants::CODEC_LZMA => Some(CodecTag::Lzma),
            constants::CODEC_ZLIB => Some(CodecTag::Zlib),
            _ => None,
        }
    }
}
