//! The pluggable block compressor layer.
//!
//! A codec is a pure function of its input bytes: `compress` must be
//! re-entrant and stateless, and `decompress` must accept exactly the bytes
//! the matching `compress` produced and yield exactly the original bytes.
//! Codecs are applied per field block, never across a whole segment.

use strake_format::error::FormatError;

/// Sentinel passed as `expected_size` when the caller has no independent
/// uncompressed-size figure to validate against (the column descriptor only
/// carries the *compressed* block size — see `strake_format::segment`). All
/// codecs treat this as "skip the size check."
pub const UNKNOWN_SIZE: usize = usize::MAX;

/// A block compressor, identified on the wire by [`Codec::tag`].
pub trait Codec: Send + Sync {
    /// The wire byte this codec is selected by.
    fn tag(&self) -> u8;

    /// Compress `bytes`, returning the compressed block.
    fn compress(&self, bytes: &[u8]) -> Vec<u8>;

    /// Decompress `bytes`, which must be exactly the output of a prior call
    /// to [`Codec::compress`] on this codec. `expected_size`, when not
    /// [`UNKNOWN_SIZE`], is validated against the decompressed length (and,
    /// for codecs that want it, used to pre-size the output buffer).
    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError>;
}

fn check_size(out_len: usize, expected_size: usize, codec_name: &str) -> Result<(), FormatError> {
    if expected_size != UNKNOWN_SIZE && out_len != expected_size {
        return Err(FormatError::DecompressError(format!(
            "{codec_name}: expected {expected_size} bytes, got {out_len}"
        )));
    }
    Ok(())
}

/// A sane `Vec::with_capacity` hint for streaming decoders: the real
/// expected size when we have one, otherwise a multiple of the compressed
/// input as a starting guess.
fn capacity_hint(expected_size: usize, compressed_len: usize) -> usize {
    if expected_size == UNKNOWN_SIZE {
        compressed_len.saturating_mul(4).max(64)
    } else {
        expected_size
    }
}

/// Identity codec: the field block is exactly the raw encoding stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneCodec;

impl Codec for NoneCodec {
    fn tag(&self) -> u8 {
        strake_format::constants::CODEC_NONE
    }

    fn compress(&self, bytes: &[u8]) -> Vec<u8> {
        bytes.to_vec()
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
        check_size(bytes.len(), expected_size, "none codec")?;
        Ok(bytes.to_vec())
    }
}

/// Snappy codec, backed by the pure-Rust `snap` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCodec;

impl Codec for SnappyCodec {
    fn tag(&self) -> u8 {
        strake_format::constants::CODEC_SNAPPY
    }

    fn compress(&self, bytes: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new()
            .compress_vec(bytes)
            .expect("snappy compression is infallible for in-memory buffers")
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
        let mut decoder = snap::raw::Decoder::new();
        let out = decoder
            .decompress_vec(bytes)
            .map_err(|e| FormatError::DecompressError(e.to_string()))?;
        check_size(out.len(), expected_size, "snappy")?;
        Ok(out)
    }
}

/// LZ4 codec, backed by the pure-Rust `lz4_flex` crate's block format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn tag(&self) -> u8 {
        strake_format::constants::CODEC_LZ4
    }

    fn compress(&self, bytes: &[u8]) -> Vec<u8> {
        lz4_flex::block::compress_prepend_size(bytes)
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
        let out = lz4_flex::block::decompress_size_prepended(bytes)
            .map_err(|e| FormatError::DecompressError(e.to_string()))?;
        check_size(out.len(), expected_size, "lz4")?;
        Ok(out)
    }
}

/// LZMA codec, backed by the `xz2` crate (liblzma bindings).
#[derive(Debug, Default, Clone, Copy)]
pub struct LzmaCodec;

impl Codec for LzmaCodec {
    fn tag(&self) -> u8 {
        strake_format::constants::CODEC_LZMA
    }

    fn compress(&self, bytes: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder
            .write_all(bytes)
            .expect("writing to an in-memory buffer cannot fail");
        encoder
            .finish()
            .expect("finishing an in-memory lzma stream cannot fail")
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
        use std::io::Read;
        let mut decoder = xz2::read::XzDecoder::new(bytes);
        let mut out = Vec::with_capacity(capacity_hint(expected_size, bytes.len()));
        decoder
            .read_to_end(&mut out)
            .map_err(|e| FormatError::DecompressError(e.to_string()))?;
        check_size(out.len(), expected_size, "lzma")?;
        Ok(out)
    }
}

/// zlib (DEFLATE) codec, backed by the `flate2` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn tag(&self) -> u8 {
        strake_format::constants::CODEC_ZLIB
    }

    fn compress(&self, bytes: &[u8]) -> Vec<u8> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(bytes)
            .expect("writing to an in-memory buffer cannot fail");
        encoder
            .finish()
            .expect("finishing an in-memory zlib stream cannot fail")
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;
        let mut decoder = ZlibDecoder::new(bytes);
        let mut out = Vec::with_capacity(capacity_hint(expected_size, bytes.len()));
        decoder
            .read_to_end(&mut out)
            .map_err(|e| FormatError::DecompressError(e.to_string()))?;
        check_size(out.len(), expected_size, "zlib")?;
        Ok(out)
    }
}

/// Resolve a wire codec tag to its implementation. Unknown tags are fatal
/// for the enclosing segment, per the format's error design.
pub fn codec_for_tag(tag: u8) -> Result<Box<dyn Codec>, FormatError> {
    match tag {
        strake_format::constants::CODEC_NONE => Ok(Box::new(NoneCodec)),
        strake_format::constants::CODEC_SNAPPY => Ok(Box::new(SnappyCodec)),
        strake_format::constants::CODEC_LZ4 => Ok(Box::new(Lz4Codec)),
        strake_format::constants::CODEC_LZMA => Ok(Box::new(LzmaCodec)),
        strake_format::constants::CODEC_ZLIB => Ok(Box::new(ZlibCodec)),
        other => Err(FormatError::UnknownCodec(other)),
    }
}
