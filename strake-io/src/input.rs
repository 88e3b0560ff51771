//! Segment input: parses segment headers from a source and hands back the
//! compressed field blocks a caller asks for. Two variants implement
//! [`SegmentInput`] — [`StreamedInput`] over any [`Read`] + [`Seek`] source,
//! and [`MappedInput`] over a fully-resident byte slice (e.g. a memory map).

use std::io::{Read, Seek, SeekFrom};

use strake_format::error::FormatError;
use strake_format::limits::Limits;
use strake_format::segment::SegmentHeader;

/// Parses one segment at a time from an underlying source and delivers the
/// compressed field blocks of requested columns.
pub trait SegmentInput {
    /// Advance to the next segment header. Returns `false` at end of input;
    /// on `true`, [`SegmentInput::codec_tag`] and [`SegmentInput::column_ids`]
    /// describe the newly loaded segment.
    fn next(&mut self) -> Result<bool, FormatError>;

    /// Codec tag of the current segment.
    fn codec_tag(&self) -> u8;

    /// Column ids present in the current segment, ascending.
    fn column_ids(&self) -> &[u32];

    /// Return the compressed block for each column in `field_filter` that
    /// exists in the current segment. An empty filter means "all columns".
    fn fill(&mut self, field_filter: &[u32]) -> Result<Vec<(u32, Vec<u8>)>, FormatError>;

    /// True once the next call to [`SegmentInput::next`] would return `false`.
    fn end(&self) -> bool;

    /// Rewind to the first segment.
    fn seek_to_start(&mut self) -> Result<(), FormatError>;

    /// Reposition at the start of the current segment's field blocks, so
    /// [`SegmentInput::fill`] can be called again with a different filter.
    fn seek_to_start_of_segment(&mut self) -> Result<(), FormatError>;
}

fn wants(field_filter: &[u32], column_id: u32) -> bool {
    field_filter.is_empty() || field_filter.contains(&column_id)
}

/// Segment input over a [`Read`] + [`Seek`] source such as an open file.
/// Skips unwanted columns by discarding their bytes rather than seeking past
/// them, so it also works where the source is merely "rewindable" rather
/// than freely seekable within a segment.
pub struct StreamedInput<R> {
    reader: R,
    limits: Limits,
    origin: u64,
    segment_data_offset: u64,
    header: Option<SegmentHeader>,
    column_ids: Vec<u32>,
    filled: bool,
    exhausted: bool,
    discard_buf: Vec<u8>,
}

impl<R: Read + Seek> StreamedInput<R> {
    /// Build a segment input over `reader`, starting at its current
    /// position.
    pub fn new(mut reader: R, limits: Limits) -> Result<Self, FormatError> {
        let origin = reader.stream_position()?;
        Ok(Self {
            reader,
            limits,
            origin,
            segment_data_offset: origin,
            header: None,
            column_ids: Vec::new(),
            filled: false,
            exhausted: false,
            discard_buf: vec![0u8; 8192],
        })
    }

    fn discard(&mut self, mut count: u64) -> Result<(), FormatError> {
        while count > 0 {
            let chunk = count.min(self.discard_buf.len() as u64) as usize;
            self.reader.read_exact(&mut self.discard_buf[..chunk])?;
            count -= chunk as u64;
        }
        Ok(())
    }

    fn skip_unfilled_segment(&mut self) -> Result<(), FormatError> {
        if let Some(header) = self.header.clone() {
            if !self.filled {
                let total: u64 = header.columns.iter().map(|c| c.compressed_block_size).sum();
                self.discard(total)?;
            }
        }
        Ok(())
    }
}

impl<R: Read + Seek> SegmentInput for StreamedInput<R> {
    fn next(&mut self) -> Result<bool, FormatError> {
        self.skip_unfilled_segment()?;

        match SegmentHeader::decode_from_reader(&mut self.reader, &self.limits)? {
            Some(header) => {
                self.segment_data_offset = self.reader.stream_position()?;
                self.column_ids = header.columns.iter().map(|c| c.column_id).collect();
                self.header = Some(header);
                self.filled = false;
                Ok(true)
            }
            None => {
                self.header = None;
                self.column_ids.clear();
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn codec_tag(&self) -> u8 {
        self.header.as_ref().map(|h| h.codec_tag).unwrap_or(0)
    }

    fn column_ids(&self) -> &[u32] {
        &self.column_ids
    }

    fn fill(&mut self, field_filter: &[u32]) -> Result<Vec<(u32, Vec<u8>)>, FormatError> {
        let header = self
            .header
            .clone()
            .expect("fill called before a successful next()");

        let mut out = Vec::new();
        for col in &header.columns {
            if wants(field_filter, col.column_id) {
                let mut buf = vec![0u8; col.compressed_block_size as usize];
                self.reader.read_exact(&mut buf)?;
                out.push((col.column_id, buf));
            } else {
                self.discard(col.compressed_block_size)?;
            }
        }
        self.filled = true;
        Ok(out)
    }

    fn end(&self) -> bool {
        self.exhausted
    }

    fn seek_to_start(&mut self) -> Result<(), FormatError> {
        self.reader.seek(SeekFrom::Start(self.origin))?;
        self.header = None;
        self.filled = false;
        self.exhausted = false;
        Ok(())
    }

    fn seek_to_start_of_segment(&mut self) -> Result<(), FormatError> {
        self.reader.seek(SeekFrom::Start(self.segment_data_offset))?;
        self.filled = false;
        Ok(())
    }
}

/// Segment input over a fully memory-resident byte range (e.g. a `Vec<u8>`
/// read in full, or a `memmap2::Mmap`). Skipping unwanted columns is free:
/// pointer arithmetic, no copy.
pub struct MappedInput<'a> {
    data: &'a [u8],
    limits: Limits,
    pos: usize,
    segment_data_offset: usize,
    next_segment_offset: usize,
    header: Option<SegmentHeader>,
    column_ids: Vec<u32>,
    exhausted: bool,
}

impl<'a> MappedInput<'a> {
    /// Build a segment input over an in-memory byte range.
    pub fn new(data: &'a [u8], limits: Limits) -> Self {
        Self {
            data,
            limits,
            pos: 0,
            segment_data_offset: 0,
            next_segment_offset: 0,
            header: None,
            column_ids: Vec::new(),
            exhausted: false,
        }
    }
}

impl<'a> SegmentInput for MappedInput<'a> {
    fn next(&mut self) -> Result<bool, FormatError> {
        self.pos = self.next_segment_offset.max(self.pos.min(self.data.len()));
        if self.header.is_some() {
            self.pos = self.next_segment_offset;
        }

        if self.pos >= self.data.len() {
            self.header = None;
            self.column_ids.clear();
            self.exhausted = true;
            return Ok(false);
        }

        let (header, consumed) = SegmentHeader::decode(&self.data[self.pos..], &self.limits)?;
        self.segment_data_offset = self.pos + consumed;
        let total: usize = header
            .columns
            .iter()
            .map(|c| c.compressed_block_size as usize)
            .sum();
        self.next_segment_offset = self.segment_data_offset + total;
        self.column_ids = header.columns.iter().map(|c| c.column_id).collect();
        self.header = Some(header);
        Ok(true)
    }

    fn codec_tag(&self) -> u8 {
        self.header.as_ref().map(|h| h.codec_tag).unwrap_or(0)
    }

    fn column_ids(&self) -> &[u32] {
        &self.column_ids
    }

    fn fill(&mut self, field_filter: &[u32]) -> Result<Vec<(u32, Vec<u8>)>, FormatError> {
        let header = self
            .header
            .as_ref()
            .expect("fill called before a successful next()");

        let mut out = Vec::new();
        let mut offset = self.segment_data_offset;
        for col in &header.columns {
            let size = col.compressed_block_size as usize;
            if wants(field_filter, col.column_id) {
                out.push((col.column_id, self.data[offset..offset + size].to_vec()));
            }
            offset += size;
        }
        Ok(out)
    }

    fn end(&self) -> bool {
        self.exhausted
    }

    fn seek_to_start(&mut self) -> Result<(), FormatError> {
        self.pos = 0;
        self.next_segment_offset = 0;
        self.header = None;
        self.column_ids.clear();
        self.exhausted = false;
        Ok(())
    }

    fn seek_to_start_of_segment(&mut self) -> Result<(), FormatError> {
        // fill() always reads from segment_data_offset, independent of pos.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use strake_codec::codec::codec_for_tag;
    use strake_codec::field_encoder::FieldEncoder;
    use strake_format::segment::ColumnDescriptor;

    fn build_segment(codec_tag: u8, columns: &[(u32, &[&[u8]])]) -> Vec<u8> {
        let codec = codec_for_tag(codec_tag).unwrap();
        let mut descriptors = Vec::new();
        let mut blocks = Vec::new();
        for (column_id, values) in columns {
            let mut encoder = FieldEncoder::new();
            for v in *values {
                encoder.put(v);
            }
            let raw = encoder.finalize();
            let compressed = codec.compress(&raw);
            descriptors.push(ColumnDescriptor {
                column_id: *column_id,
                compressed_block_size: compressed.len() as u64,
            });
            blocks.push(compressed);
        }
        let header = SegmentHeader {
            codec_tag,
            columns: descriptors,
        };
        let mut bytes = header.encode();
        for b in blocks {
            bytes.extend_from_slice(&b);
        }
        bytes
    }

    #[test]
    fn mapped_input_iterates_two_segments() {
        let mut data = build_segment(0, &[(1, &[b"a".as_slice(), b"b".as_slice()])]);
        data.extend(build_segment(0, &[(1, &[b"c".as_slice()])]));

        let mut input = MappedInput::new(&data, Limits::default());
        assert!(input.next().unwrap());
        assert_eq!(input.column_ids(), &[1]);
        let blocks = input.fill(&[]).unwrap();
        assert_eq!(blocks.len(), 1);

        assert!(input.next().unwrap());
        let blocks = input.fill(&[]).unwrap();
        assert_eq!(blocks.len(), 1);

        assert!(!input.next().unwrap());
        assert!(input.end());
    }

    #[test]
    fn mapped_input_fill_filters_columns() {
        let data = build_segment(
            0,
            &[(1, &[b"x".as_slice()]), (2, &[b"y".as_slice()])],
        );
        let mut input = MappedInput::new(&data, Limits::default());
        assert!(input.next().unwrap());
        let blocks = input.fill(&[2]).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].0, 2);
    }

    #[test]
    fn streamed_input_skips_unfilled_segment_on_next() {
        let mut data = build_segment(0, &[(1, &[b"a".as_slice()]), (2, &[b"b".as_slice()])]);
        data.extend(build_segment(0, &[(1, &[b"c".as_slice()])]));

        let cursor = Cursor::new(data);
        let mut input = StreamedInput::new(cursor, Limits::default()).unwrap();
        assert!(input.next().unwrap());
        // No fill() call for the first segment: next() must skip its blocks.
        assert!(input.next().unwrap());
        let blocks = input.fill(&[]).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].1, build_segment(0, &[(1, &[b"c".as_slice()])])[10..]);
    }

    #[test]
    fn streamed_input_seek_to_start_of_segment_allows_refill() {
        let data = build_segment(
            0,
            &[(1, &[b"x".as_slice()]), (2, &[b"y".as_slice()])],
        );
        let cursor = Cursor::new(data);
        let mut input = StreamedInput::new(cursor, Limits::default()).unwrap();
        assert!(input.next().unwrap());
        let first = input.fill(&[1]).unwrap();
        assert_eq!(first.len(), 1);

        input.seek_to_start_of_segment().unwrap();
        let second = input.fill(&[2]).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, 2);
    }

    #[test]
    fn streamed_input_seek_to_start_rewinds() {
        let data = build_segment(0, &[(1, &[b"a".as_slice()])]);
        let cursor = Cursor::new(data);
        let mut input = StreamedInput::new(cursor, Limits::default()).unwrap();
        assert!(input.next().unwrap());
        input.fill(&[]).unwrap();
        assert!(!input.next().unwrap());

        input.seek_to_start().unwrap();
        assert!(input.next().unwrap());
    }
}
