//! Constants and magic numbers for the segment file format

/// Segment header magic: "SFS1" (Strake File Segment, format 1).
pub const SEGMENT_MAGIC: [u8; 4] = [0x53, 0x46, 0x53, 0x31];

/// Codec tag: stored verbatim, no transform applied.
pub const CODEC_NONE: u8 = 0;
/// Codec tag: Snappy block compression.
pub const CODEC_SNAPPY: u8 = 1;
/// Codec tag: LZ4 block compression.
pub const CODEC_LZ4: u8 = 2;
/// Codec tag: LZMA block compression.
pub const CODEC_LZMA: u8 = 3;
/// Codec tag: zlib (DEFLATE) block compression.
pub const CODEC_ZLIB: u8 = 4;

/// Flag bit (low bit of a run's header byte) marking the run as null.
pub const RUN_NULL_FLAG: u8 = 0x01;
