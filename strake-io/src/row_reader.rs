//! Row reader: multiplexes field decoders for a caller-chosen column filter
//! over a [`SegmentInput`], one segment at a time.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use strake_codec::codec::codec_for_tag;
use strake_codec::field_decoder::FieldDecoder;
use strake_format::error::FormatError;
use strake_format::limits::Limits;

use crate::input::{MappedInput, SegmentInput, StreamedInput};
use crate::parallel::{Executor, SequentialExecutor};

/// Errors from the row-reading path: format failures plus reader misuse.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// `peek`/`get` named a column outside the current column filter.
    #[error("column {0} is not in the current column filter")]
    ColumnNotInFilter(u32),
    /// `get_row` called while [`RowReader::end`] is already `true`.
    #[error("get_row called at end of rows")]
    EndOfRows,
    /// A lower-level format or I/O failure.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Reads rows out of a segment stream, exposing only the columns named by
/// the current column filter. No filter ever set means "all columns present
/// in the segment"; an explicitly set *empty* filter means "no columns" (the
/// select engine relies on this distinction for an empty selection). Column
/// filter changes take effect the next time segment blocks are (re)loaded —
/// either by advancing to a new segment or by
/// [`RowReader::seek_to_start_of_segment`].
pub struct RowReader<I> {
    input: I,
    executor: Box<dyn Executor>,
    active_filter: Option<Vec<u32>>,
    pending_filter: Option<Vec<u32>>,
    visible_columns: Vec<u32>,
    decoders: BTreeMap<u32, FieldDecoder>,
    row_count: u64,
    rows_emitted: u64,
    segment_loaded: bool,
}

impl<I: SegmentInput> RowReader<I> {
    /// Build a row reader over any [`SegmentInput`], with no column filter
    /// (all columns visible) and sequential block decompression.
    pub fn new(input: I) -> Self {
        Self {
            input,
            executor: Box::new(SequentialExecutor),
            active_filter: None,
            pending_filter: None,
            visible_columns: Vec::new(),
            decoders: BTreeMap::new(),
            row_count: 0,
            rows_emitted: 0,
            segment_loaded: false,
        }
    }

    /// Swap in a different block-decompression executor (e.g. [`crate::parallel::RayonExecutor`]).
    pub fn with_executor(mut self, executor: Box<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Restrict visible columns to exactly `columns`. An empty slice is a
    /// deliberate "no columns" filter, distinct from never having called this
    /// at all (which leaves every column in the segment visible). Takes
    /// effect the next time segment blocks are (re)loaded.
    pub fn set_column_filter(&mut self, columns: &[u32]) {
        let mut filter = columns.to_vec();
        filter.sort_unstable();
        filter.dedup();
        self.pending_filter = Some(filter);
    }

    /// True once there are no more rows anywhere in the input: the current
    /// segment (if any) is exhausted and no further segment follows.
    /// Transparently advances across segment boundaries.
    pub fn end(&mut self) -> Result<bool, ReadError> {
        loop {
            if !self.segment_loaded && !self.load_next_segment()? {
                return Ok(true);
            }
            if self.rows_emitted < self.row_count {
                return Ok(false);
            }
            self.segment_loaded = false;
        }
    }

    /// True once the current segment's rows are exhausted. Does not look
    /// ahead to later segments; lazily loads the first segment if none has
    /// been loaded yet.
    pub fn end_of_segment(&mut self) -> Result<bool, ReadError> {
        if !self.segment_loaded && !self.load_next_segment()? {
            return Ok(true);
        }
        Ok(self.rows_emitted >= self.row_count)
    }

    /// Return the current value of `column_id` (or `None` for null, or for a
    /// column absent from this segment) without consuming a row.
    pub fn peek(&mut self, column_id: u32) -> Result<Option<Vec<u8>>, ReadError> {
        self.ensure_column_in_filter(column_id)?;
        match self.decoders.get_mut(&column_id) {
            Some(decoder) => Ok(decoder.peek()?.map(|v| v.to_vec())),
            None => Ok(None),
        }
    }

    /// Return the current value of `column_id`, consuming one row step: the
    /// column's own decoder advances and the reader's row position moves
    /// forward by one, exactly as [`RowReader::get_row`] does for every
    /// visible column at once. Callers that read one column at a time (the
    /// select engine's filter passes) rely on this to keep the reader's row
    /// position in sync with that column's decoder.
    pub fn get(&mut self, column_id: u32) -> Result<Option<Vec<u8>>, ReadError> {
        self.ensure_column_in_filter(column_id)?;
        if self.rows_emitted >= self.row_count {
            return Err(ReadError::EndOfRows);
        }
        let value = match self.decoders.get_mut(&column_id) {
            Some(decoder) => decoder.get()?.map(|v| v.to_vec()),
            None => None,
        };
        self.rows_emitted += 1;
        Ok(value)
    }

    /// Return one full row (every visible column, ascending column_id
    /// order), advancing every active decoder exactly once.
    pub fn get_row(&mut self) -> Result<Vec<(u32, Option<Vec<u8>>)>, ReadError> {
        if self.end()? {
            return Err(ReadError::EndOfRows);
        }
        let columns = self.visible_columns.clone();
        let mut row = Vec::with_capacity(columns.len());
        for column_id in columns {
            let value = match self.decoders.get_mut(&column_id) {
                Some(decoder) => decoder.get()?.map(|v| v.to_vec()),
                None => None,
            };
            row.push((column_id, value));
        }
        self.rows_emitted += 1;
        Ok(row)
    }

    /// Reposition at the start of the current segment's field blocks,
    /// applying any pending column filter change.
    pub fn seek_to_start_of_segment(&mut self) -> Result<(), ReadError> {
        self.apply_pending_filter();
        self.input.seek_to_start_of_segment()?;
        self.install_segment_blocks()?;
        Ok(())
    }

    /// Rewind to the first segment of the input.
    pub fn seek_to_start(&mut self) -> Result<(), ReadError> {
        self.input.seek_to_start()?;
        self.segment_loaded = false;
        self.decoders.clear();
        self.visible_columns.clear();
        self.rows_emitted = 0;
        self.row_count = 0;
        Ok(())
    }

    fn ensure_column_in_filter(&self, column_id: u32) -> Result<(), ReadError> {
        if let Some(filter) = &self.active_filter {
            if !filter.contains(&column_id) {
                return Err(ReadError::ColumnNotInFilter(column_id));
            }
        }
        Ok(())
    }

    fn apply_pending_filter(&mut self) {
        if let Some(filter) = self.pending_filter.take() {
            self.active_filter = Some(filter);
        }
    }

    fn load_next_segment(&mut self) -> Result<bool, ReadError> {
        self.apply_pending_filter();
        if !self.input.next()? {
            self.segment_loaded = false;
            self.decoders.clear();
            self.visible_columns.clear();
            return Ok(false);
        }
        self.install_segment_blocks()?;
        Ok(true)
    }

    /// Fetch and decompress blocks for the currently active filter, plus a
    /// bootstrap column (the segment's lowest column_id) used to learn the
    /// segment's row count even when it is absent from the filter — a
    /// segment never stores its row count directly.
    fn install_segment_blocks(&mut self) -> Result<(), ReadError> {
        let column_ids = self.input.column_ids().to_vec();
        let bootstrap_id = *column_ids
            .iter()
            .min()
            .expect("a flushed segment always has at least one column");

        let visible = match &self.active_filter {
            None => column_ids.clone(),
            Some(filter) => filter.clone(),
        };

        let mut wanted = visible.clone();
        if !wanted.contains(&bootstrap_id) {
            wanted.push(bootstrap_id);
        }
        wanted.sort_unstable();
        wanted.dedup();

        let codec = codec_for_tag(self.input.codec_tag())?;
        let compressed_blocks = self.input.fill(&wanted)?;
        let raw_blocks = self
            .executor
            .decompress_all(codec.as_ref(), compressed_blocks)?;

        self.decoders.clear();
        let mut row_count = None;
        for (column_id, raw) in raw_blocks {
            if column_id == bootstrap_id {
                row_count = Some(count_rows(raw.clone())?);
            }
            if visible.contains(&column_id) {
                self.decoders.insert(column_id, FieldDecoder::new(raw));
            }
        }

        self.visible_columns = visible;
        self.row_count = row_count.expect("bootstrap column is always requested");
        self.rows_emitted = 0;
        self.segment_loaded = true;
        Ok(())
    }
}

/// Count the logical rows encoded in a raw (decompressed) field block,
/// without retaining any of the reconstructed values.
fn count_rows(raw: Vec<u8>) -> Result<u64, FormatError> {
    let mut decoder = FieldDecoder::new(raw);
    let mut count = 0u64;
    while !decoder.end()? {
        decoder.get()?;
        count += 1;
    }
    Ok(count)
}

impl<R: Read + Seek> RowReader<StreamedInput<R>> {
    /// Build a row reader over a streamed (file-descriptor-like) input.
    pub fn from_reader(reader: R, limits: Limits) -> Result<Self, FormatError> {
        let input = StreamedInput::new(reader, limits)?;
        Ok(Self::new(input))
    }
}

impl<'a> RowReader<MappedInput<'a>> {
    /// Build a row reader over a fully memory-resident input (e.g. a
    /// `memmap2::Mmap` or an owned byte buffer).
    pub fn from_mapped(data: &'a [u8], limits: Limits) -> Self {
        Self::new(MappedInput::new(data, limits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strake_codec::codec::codec_for_tag as codec_for_tag_test;
    use strake_codec::field_encoder::FieldEncoder;
    use strake_format::segment::{ColumnDescriptor, SegmentHeader};

    fn build_segment(codec_tag: u8, columns: &[(u32, &[&[u8]])]) -> Vec<u8> {
        let codec = codec_for_tag_test(codec_tag).unwrap();
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
    fn reads_every_row_with_no_filter() {
        let data = build_segment(
            0,
            &[
                (1, &[b"a".as_slice(), b"b".as_slice()]),
                (2, &[b"x".as_slice(), b"y".as_slice()]),
            ],
        );
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        let mut rows = Vec::new();
        while !reader.end().unwrap() {
            rows.push(reader.get_row().unwrap());
        }
        assert_eq!(
            rows,
            vec![
                vec![(1, Some(b"a".to_vec())), (2, Some(b"x".to_vec()))],
                vec![(1, Some(b"b".to_vec())), (2, Some(b"y".to_vec()))],
            ]
        );
    }

    #[test]
    fn filter_restricts_visible_columns() {
        let data = build_segment(
            0,
            &[(1, &[b"a".as_slice()]), (2, &[b"x".as_slice()])],
        );
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.set_column_filter(&[2]);
        assert!(!reader.end().unwrap());
        let row = reader.get_row().unwrap();
        assert_eq!(row, vec![(2, Some(b"x".to_vec()))]);
    }

    #[test]
    fn get_on_column_outside_filter_is_an_error() {
        let data = build_segment(0, &[(1, &[b"a".as_slice()]), (2, &[b"x".as_slice()])]);
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.set_column_filter(&[2]);
        reader.end().unwrap();
        let err = reader.get(1).unwrap_err();
        assert!(matches!(err, ReadError::ColumnNotInFilter(1)));
    }

    #[test]
    fn missing_column_in_one_segment_reads_as_null() {
        let mut data = build_segment(0, &[(1, &[b"a".as_slice()])]);
        data.extend(build_segment(
            0,
            &[(1, &[b"b".as_slice()]), (2, &[b"y".as_slice()])],
        ));
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.set_column_filter(&[1, 2]);
        let mut rows = Vec::new();
        while !reader.end().unwrap() {
            rows.push(reader.get_row().unwrap());
        }
        assert_eq!(
            rows,
            vec![
                vec![(1, Some(b"a".to_vec())), (2, None)],
                vec![(1, Some(b"b".to_vec())), (2, Some(b"y".to_vec()))],
            ]
        );
    }

    #[test]
    fn get_row_past_end_is_an_error() {
        let data = build_segment(0, &[(1, &[b"a".as_slice()])]);
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.get_row().unwrap();
        assert!(reader.end().unwrap());
        let err = reader.get_row().unwrap_err();
        assert!(matches!(err, ReadError::EndOfRows));
    }

    #[test]
    fn seek_to_start_of_segment_reapplies_a_new_filter() {
        let data = build_segment(
            0,
            &[(1, &[b"a".as_slice()]), (2, &[b"x".as_slice()])],
        );
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.set_column_filter(&[1]);
        assert_eq!(reader.get_row().unwrap(), vec![(1, Some(b"a".to_vec()))]);

        reader.set_column_filter(&[2]);
        reader.seek_to_start_of_segment().unwrap();
        assert_eq!(reader.get_row().unwrap(), vec![(2, Some(b"x".to_vec()))]);
    }

    #[test]
    fn seek_to_start_rewinds_across_segments() {
        let mut data = build_segment(0, &[(1, &[b"a".as_slice()])]);
        data.extend(build_segment(0, &[(1, &[b"b".as_slice()])]));
        let mut reader = RowReader::from_mapped(&data, Limits::default());
        reader.get_row().unwrap();
        reader.get_row().unwrap();
        assert!(reader.end().unwrap());

        reader.seek_to_start().unwrap();
        assert!(!reader.end().unwrap());
        assert_eq!(reader.get_row().unwrap(), vec![(1, Some(b"a".to_vec()))]);
    }
}
