//! Codec, field encoder and field decoder: the per-column encoding engine.
//!
//! This crate provides:
//!
//! - The [`Codec`] trait and its five tag-numbered implementations
//!   (none / snappy / lz4 / lzma / zlib)
//! - [`FieldEncoder`], which turns a column's values into a run-length +
//!   shared-prefix encoded byte stream
//! - [`FieldDecoder`], the inverse

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod field_decoder;
pub mod field_encoder;

pub use codec::{
    codec_for_tag, Codec, Lz4Codec, LzmaCodec, NoneCodec, SnappyCodec, ZlibCodec, UNKNOWN_SIZE,
};
pub use field_decoder::FieldDecoder;
pub use field_encoder::FieldEncoder;

pub use strake_format::{CodecTag, ColumnDescriptor, FormatError, Limits, SegmentHeader};
