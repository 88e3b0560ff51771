//! Streaming segment writer.

use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;

use strake_codec::codec::codec_for_tag;
use strake_codec::field_encoder::FieldEncoder;
use strake_format::error::FormatError;
use strake_format::segment::{ColumnDescriptor, SegmentHeader};

/// Where a writer hands finished segments. The original columnar
/// implementation this format is modeled on keeps the writer talking to an
/// abstract output rather than a concrete file descriptor; this trait is
/// that seam.
pub trait SegmentSink {
    /// Write one complete segment (header bytes followed by each column's
    /// compressed field block, in descriptor order).
    fn write_segment(&mut self, segment_bytes: &[u8]) -> Result<(), FormatError>;

    /// Close the sink, optionally handing back an owned value (e.g. the
    /// backing file) for callers who want it.
    fn finalize(self: Box<Self>) -> Result<Box<dyn Any>, FormatError>;
}

/// A [`SegmentSink`] over any [`Write`]r.
pub struct WriteSink<W: Write + 'static> {
    inner: Option<W>,
}

impl<W: Write + 'static> WriteSink<W> {
    /// Wrap a writer as a segment sink.
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }
}

impl<W: Write + 'static> SegmentSink for WriteSink<W> {
    fn write_segment(&mut self, segment_bytes: &[u8]) -> Result<(), FormatError> {
        let writer = self
            .inner
            .as_mut()
            .expect("write_segment called after finalize");
        writer.write_all(segment_bytes)?;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<Box<dyn Any>, FormatError> {
        let writer = self.inner.take().expect("finalize called twice");
        Ok(Box::new(writer))
    }
}

/// Writer-side configuration: which codec new segments use.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Codec tag applied to every field block of every segment this writer
    /// flushes (see `strake_format::constants` for the tag values).
    pub codec_tag: u8,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            codec_tag: strake_format::constants::CODEC_LZ4,
        }
    }
}

/// Metrics accumulated over a writer's lifetime, for progress reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterMetrics {
    /// Total rows written across all flushed segments (plus any pending).
    pub rows_written: u64,
    /// Total segments emitted to the sink.
    pub segments_written: u64,
    /// Total bytes written to the sink.
    pub bytes_written: u64,
}

/// Buffers one [`FieldEncoder`] per column seen in the current segment;
/// flushing commits every encoder, compresses each block, and emits one
/// segment to the sink.
pub struct SegmentWriter {
    sink: Option<Box<dyn SegmentSink>>,
    opts: WriterOptions,
    fields: BTreeMap<u32, FieldEncoder>,
    rows_in_segment: u64,
    pending_size: usize,
    finished: bool,
    metrics: WriterMetrics,
}

impl SegmentWriter {
    /// Create a writer over the given sink.
    pub fn new(sink: Box<dyn SegmentSink>, opts: WriterOptions) -> Self {
        Self {
            sink: Some(sink),
            opts,
            fields: BTreeMap::new(),
            rows_in_segment: 0,
            pending_size: 0,
            finished: false,
            metrics: WriterMetrics::default(),
        }
    }

    /// Append one non-null value to `column_id`, creating its encoder (and
    /// backfilling it with nulls up to the current row index) if this is
    /// the column's first appearance in the current segment.
    pub fn put(&mut self, column_id: u32, bytes: &[u8]) {
        let rows_so_far = self.rows_in_segment;
        let encoder = self.field_encoder_backfilled(column_id, rows_so_far);
        encoder.put(bytes);
        self.pending_size += bytes.len();
    }

    /// Append one null value to `column_id`.
    pub fn put_null(&mut self, column_id: u32) {
        let rows_so_far = self.rows_in_segment;
        let encoder = self.field_encoder_backfilled(column_id, rows_so_far);
        encoder.put_null();
    }

    fn field_encoder_backfilled(&mut self, column_id: u32, rows_so_far: u64) -> &mut FieldEncoder {
        self.fields.entry(column_id).or_insert_with(|| {
            let mut encoder = FieldEncoder::new();
            for _ in 0..rows_so_far {
                encoder.put_null();
            }
            encoder
        })
    }

    /// Apply one row: for every column already present in this segment but
    /// missing from `row`, writes a null; for every column in `row` not yet
    /// seen this segment, the column is created and backfilled with nulls up
    /// to the current row index first. Duplicate `column_id`s in `row` are a
    /// misuse error.
    pub fn put_row(&mut self, row: &[(u32, Option<&[u8]>)]) -> Result<(), WriteError> {
        let mut seen = std::collections::HashSet::with_capacity(row.len());
        for (column_id, _) in row {
            if !seen.insert(*column_id) {
                return Err(WriteError::DuplicateColumn(*column_id));
            }
        }

        for (column_id, value) in row {
            match value {
                Some(bytes) => self.put(*column_id, bytes),
                None => self.put_null(*column_id),
            }
        }

        let touched: std::collections::HashSet<u32> = row.iter().map(|(c, _)| *c).collect();
        for (&column_id, encoder) in self.fields.iter_mut() {
            if !touched.contains(&column_id) {
                encoder.put_null();
            }
        }

        self.rows_in_segment += 1;
        Ok(())
    }

    /// Approximate uncompressed bytes of value data appended via `put` /
    /// `put_row` since the last flush. Excludes backfill nulls and encoding
    /// overhead.
    pub fn pending_size(&self) -> usize {
        self.pending_size
    }

    /// Emit one segment (if non-empty) and reset per-column state.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        if self.fields.is_empty() {
            return Ok(());
        }

        let codec = codec_for_tag(self.opts.codec_tag)?;
        let fields = std::mem::take(&mut self.fields);

        let mut columns = Vec::with_capacity(fields.len());
        let mut blocks = Vec::with_capacity(fields.len());
        for (column_id, encoder) in fields {
            let raw = encoder.finalize();
            let compressed = codec.compress(&raw);
            columns.push(ColumnDescriptor {
                column_id,
                compressed_block_size: compressed.len() as u64,
            });
            blocks.push(compressed);
        }

        let header = SegmentHeader {
            codec_tag: self.opts.codec_tag,
            columns,
        };

        let mut segment_bytes = header.encode();
        for block in &blocks {
            segment_bytes.extend_from_slice(block);
        }

        let sink = self
            .sink
            .as_mut()
            .expect("flush called after finalize");
        sink.write_segment(&segment_bytes)?;

        self.metrics.rows_written += self.rows_in_segment;
        self.metrics.segments_written += 1;
        self.metrics.bytes_written += segment_bytes.len() as u64;

        self.rows_in_segment = 0;
        self.pending_size = 0;

        Ok(())
    }

    /// Flush if non-empty, then close the sink. Returns whatever the sink's
    /// [`SegmentSink::finalize`] hands back (e.g. the backing `File`).
    pub fn finalize(mut self) -> Result<Box<dyn Any>, WriteError> {
        self.flush()?;
        self.finished = true;
        let sink = self.sink.take().expect("finalize called twice");
        Ok(sink.finalize()?)
    }

    /// Snapshot current metrics without consuming the writer.
    pub fn metrics(&self) -> WriterMetrics {
        self.metrics
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        if !self.finished && self.sink.is_some() {
            eprintln!("Warning: SegmentWriter dropped without calling finalize() - data may be lost");
        }
    }
}

/// Errors from the write path: format-level failures plus writer misuse.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// A `put_row` call named the same column twice.
    #[error("duplicate column_id {0} in put_row")]
    DuplicateColumn(u32),
    /// A lower-level format or I/O failure.
    #[error(transparent)]
    Format(#[from] FormatError),
}
