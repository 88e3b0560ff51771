//! Segment header: the bit-level framing around a segment's field blocks.
//!
//! A segment on disk is: magic/format header; varint codec tag; varint
//! column count K; K column descriptors; K compressed field blocks, in the
//! order of the descriptors. This module encodes/decodes everything up to
//! (but not including) the field block bytes themselves — those are opaque
//! payloads the codec layer produces and consumes.

use crate::constants::SEGMENT_MAGIC;
use crate::error::FormatError;
use crate::limits::Limits;
use crate::varint::{decode_uleb128, encode_uleb128, read_uleb128_from};
use std::io::Read;

/// One column's entry in a segment's descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// The caller-assigned column identifier.
    pub column_id: u32,
    /// Size, in bytes, of this column's compressed field block.
    pub compressed_block_size: u64,
}

/// The parsed header of one segment: its codec tag and column descriptor
/// table, in the ascending column_id order the format requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// The codec tag applied to every field block in this segment.
    pub codec_tag: u8,
    /// Column descriptors, ascending by `column_id`.
    pub columns: Vec<ColumnDescriptor>,
}

impl SegmentHeader {
    /// Encode the header portion of a segment (magic, codec tag, column
    /// count, descriptor table). The caller appends the compressed field
    /// blocks themselves, in descriptor order, immediately after.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 1 + 5 + self.columns.len() * 10);
        out.extend_from_slice(&SEGMENT_MAGIC);
        out.extend_from_slice(&encode_uleb128(self.codec_tag as u64));
        out.extend_from_slice(&encode_uleb128(self.columns.len() as u64));
        for col in &self.columns {
            out.extend_from_slice(&encode_uleb128(col.column_id as u64));
            out.extend_from_slice(&encode_uleb128(col.compressed_block_size));
        }
        out
    }

    /// Decode a segment header from the front of `bytes`, validating against
    /// `limits`. Returns the header and the number of bytes consumed (so the
    /// caller can locate the first field block).
    ///
    /// Used by the mapped (fully memory-resident) segment input, where the
    /// whole byte range is already available.
    pub fn decode(bytes: &[u8], limits: &Limits) -> Result<(Self, usize), FormatError> {
        if bytes.len() < 4 {
            return Err(FormatError::UnexpectedEof);
        }
        if bytes[..4] != SEGMENT_MAGIC {
            return Err(FormatError::InvalidMagic);
        }
        let mut pos = 4usize;

        let (codec_tag_raw, n) = decode_uleb128(&bytes[pos..])?;
        pos += n;
        let codec_tag = u8::try_from(codec_tag_raw)
            .map_err(|_| FormatError::UnknownCodec(u8::MAX))?;

        let (count_raw, n) = decode_uleb128(&bytes[pos..])?;
        pos += n;
        let count = count_raw as usize;
        if count > limits.max_columns_per_segment {
            return Err(FormatError::LimitExceeded(format!(
                "segment declares {count} columns, limit is {}",
                limits.max_columns_per_segment
            )));
        }

        let mut columns = Vec::with_capacity(count);
        let mut prev_column_id: Option<u32> = None;
        for _ in 0..count {
            let (column_id_raw, n) = decode_uleb128(&bytes[pos..])?;
            pos += n;
            let column_id = u32::try_from(column_id_raw)
                .map_err(|_| FormatError::LimitExceeded("column_id exceeds u32".into()))?;

            let (block_size, n) = decode_uleb128(&bytes[pos..])?;
            pos += n;
            if block_size as usize > limits.max_compressed_block_size {
                return Err(FormatError::LimitExceeded(format!(
                    "field block of {block_size} bytes exceeds limit {}",
                    limits.max_compressed_block_size
                )));
            }

            if let Some(prev) = prev_column_id {
                if column_id <= prev {
                    return Err(FormatError::ColumnCountMismatch {
                        declared: count,
                        found: columns.len(),
                    });
                }
            }
            prev_column_id = Some(column_id);

            columns.push(ColumnDescriptor {
                column_id,
                compressed_block_size: block_size,
            });
        }

        Ok((
            Self {
                codec_tag,
                columns,
            },
            pos,
        ))
    }

    /// Decode a segment header directly from a [`Read`] stream, without
    /// requiring the caller to know its length up front.
    ///
    /// Used by the streamed (file-descriptor backed) segment input.
    pub fn decode_from_reader<R: Read>(
        reader: &mut R,
        limits: &Limits,
    ) -> Result<Option<Self>, FormatError> {
        let mut magic = [0u8; 4];
        match read_fully_or_eof(reader, &mut magic)? {
            ReadOutcome::Eof => return Ok(None),
            ReadOutcome::Short => return Err(FormatError::UnexpectedEof),
            ReadOutcome::Full => {}
        }
        if magic != SEGMENT_MAGIC {
            return Err(FormatError::InvalidMagic);
        }

        let codec_tag_raw = read_uleb128_from(reader)?;
        let codec_tag =
            u8::try_from(codec_tag_raw).map_err(|_| FormatError::UnknownCodec(u8::MAX))?;

        let count = read_uleb128_from(reader)? as usize;
        if count > limits.max_columns_per_segment {
            return Err(FormatError::LimitExceeded(format!(
                "segment declares {count} columns, limit is {}",
                limits.max_columns_per_segment
            )));
        }

        let mut columns = Vec::with_capacity(count);
        let mut prev_column_id: Option<u32> = None;
        for _ in 0..count {
            let column_id_raw = read_uleb128_from(reader)?;
            let column_id = u32::try_from(column_id_raw)
                .map_err(|_| FormatError::LimitExceeded("column_id exceeds u32".into()))?;
            let block_size = read_uleb128_from(reader)?;
            if block_size as usize > limits.max_compressed_block_size {
                return Err(FormatError::LimitExceeded(format!(
                    "field block of {block_size} bytes exceeds limit {}",
                    limits.max_compressed_block_size
                )));
            }
            if let Some(prev) = prev_column_id {
                if column_id <= prev {
                    return Err(FormatError::ColumnCountMismatch {
                        declared: count,
                        found: columns.len(),
                    });
                }
            }
            prev_column_id = Some(column_id);
            columns.push(ColumnDescriptor {
                column_id,
                compressed_block_size: block_size,
            });
        }

        Ok(Some(Self {
            codec_tag,
            columns,
        }))
    }
}

enum ReadOutcome {
    Full,
    Short,
    Eof,
}

fn read_fully_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<ReadOutcome, FormatError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(if filled == 0 {
                ReadOutcome::Eof
            } else {
                ReadOutcome::Short
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}
