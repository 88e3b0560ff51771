//! End-to-end write -> read -> select round trips, using real temp files so
//! the streamed (file-descriptor) path is exercised alongside the mapped one.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use strake_format::constants::{CODEC_LZ4, CODEC_NONE, CODEC_SNAPPY, CODEC_ZLIB};
use strake_format::limits::Limits;
use strake_io::region::RegionPool;
use strake_io::row_reader::RowReader;
use strake_io::select::{execute, Predicate};
use strake_io::writer::{SegmentWriter, WriteSink, WriterOptions};
use tempfile::NamedTempFile;

fn write_two_columns(path: &std::path::Path, codec_tag: u8, rows: &[(Option<&[u8]>, Option<&[u8]>)]) {
    let file = File::create(path).unwrap();
    let sink = WriteSink::new(BufWriter::new(file));
    let mut writer = SegmentWriter::new(Box::new(sink), WriterOptions { codec_tag });
    for (a, b) in rows {
        writer
            .put_row(&[(1, *a), (2, *b)])
            .unwrap();
    }
    writer.finalize().unwrap();
}

fn read_all_rows(path: &std::path::Path) -> Vec<Vec<(u32, Option<Vec<u8>>)>> {
    let file = File::open(path).unwrap();
    let mut reader = RowReader::from_reader(BufReader::new(file), Limits::default()).unwrap();
    let mut rows = Vec::new();
    while !reader.end().unwrap() {
        rows.push(reader.get_row().unwrap());
    }
    rows
}

#[test]
fn two_column_round_trip_over_a_real_file() {
    let tmp = NamedTempFile::new().unwrap();
    write_two_columns(
        tmp.path(),
        CODEC_LZ4,
        &[
            (Some(b"a".as_slice()), Some(b"x".as_slice())),
            (Some(b"b".as_slice()), None),
            (None, Some(b"y".as_slice())),
        ],
    );

    let rows = read_all_rows(tmp.path());
    assert_eq!(
        rows,
        vec![
            vec![(1, Some(b"a".to_vec())), (2, Some(b"x".to_vec()))],
            vec![(1, Some(b"b".to_vec())), (2, None)],
            vec![(1, None), (2, Some(b"y".to_vec()))],
        ]
    );
}

#[test]
fn shared_prefix_stress_round_trips() {
    let tmp = NamedTempFile::new().unwrap();
    let values: Vec<Vec<u8>> = (0..500)
        .map(|i| format!("common-prefix-{i:05}").into_bytes())
        .collect();
    let rows: Vec<(Option<&[u8]>, Option<&[u8]>)> =
        values.iter().map(|v| (Some(v.as_slice()), None)).collect();
    write_two_columns(tmp.path(), CODEC_NONE, &rows);

    let read_back = read_all_rows(tmp.path());
    assert_eq!(read_back.len(), values.len());
    for (row, expected) in read_back.iter().zip(values.iter()) {
        assert_eq!(row[0].1.as_ref().unwrap(), expected);
    }
}

#[test]
fn mid_segment_column_backfill_round_trips_as_null() {
    let tmp = NamedTempFile::new().unwrap();
    let file = File::create(tmp.path()).unwrap();
    let sink = WriteSink::new(BufWriter::new(file));
    let mut writer = SegmentWriter::new(Box::new(sink), WriterOptions::default());
    writer.put_row(&[(1, Some(b"a".as_slice()))]).unwrap();
    writer
        .put_row(&[(1, Some(b"b".as_slice())), (2, Some(b"x".as_slice()))])
        .unwrap();
    writer.finalize().unwrap();

    let rows = read_all_rows(tmp.path());
    assert_eq!(
        rows,
        vec![
            vec![(1, Some(b"a".to_vec())), (2, None)],
            vec![(1, Some(b"b".to_vec())), (2, Some(b"x".to_vec()))],
        ]
    );
}

#[test]
fn multi_segment_filter_skips_unselected_segment_columns() {
    let tmp = NamedTempFile::new().unwrap();
    let file = File::create(tmp.path()).unwrap();
    let sink = WriteSink::new(BufWriter::new(file));
    let mut writer = SegmentWriter::new(Box::new(sink), WriterOptions::default());
    writer
        .put_row(&[(1, Some(b"a".as_slice())), (2, Some(b"x".as_slice()))])
        .unwrap();
    writer.flush().unwrap();
    writer
        .put_row(&[(1, Some(b"b".as_slice())), (2, Some(b"y".as_slice()))])
        .unwrap();
    writer.finalize().unwrap();

    let file = File::open(tmp.path()).unwrap();
    let mut reader = RowReader::from_reader(BufReader::new(file), Limits::default()).unwrap();
    reader.set_column_filter(&[2]);
    let mut values = Vec::new();
    while !reader.end().unwrap() {
        values.push(reader.get_row().unwrap());
    }
    assert_eq!(
        values,
        vec![
            vec![(2, Some(b"x".to_vec()))],
            vec![(2, Some(b"y".to_vec()))],
        ]
    );
}

struct Equals(Vec<u8>);

impl Predicate for Equals {
    fn test(&self, value: Option<&[u8]>) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(value == Some(self.0.as_slice()))
    }
}

#[test]
fn predicate_and_projection_over_multiple_segments() {
    let tmp = NamedTempFile::new().unwrap();
    let file = File::create(tmp.path()).unwrap();
    let sink = WriteSink::new(BufWriter::new(file));
    let mut writer = SegmentWriter::new(Box::new(sink), WriterOptions::default());
    writer
        .put_row(&[(1, Some(b"keep".as_slice())), (2, Some(b"one".as_slice()))])
        .unwrap();
    writer
        .put_row(&[(1, Some(b"drop".as_slice())), (2, Some(b"two".as_slice()))])
        .unwrap();
    writer.flush().unwrap();
    writer
        .put_row(&[(1, Some(b"keep".as_slice())), (2, Some(b"three".as_slice()))])
        .unwrap();
    writer.finalize().unwrap();

    let data = std::fs::read(tmp.path()).unwrap();
    let mut reader = RowReader::from_mapped(&data, Limits::default());
    let pool = RegionPool::new();
    let filters: Vec<(u32, Box<dyn Predicate>)> = vec![(1, Box::new(Equals(b"keep".to_vec())))];

    let mut seen = Vec::new();
    execute(&mut reader, &[2], &filters, &pool, |row| {
        seen.push(
            row.iter()
                .map(|(c, v)| (*c, v.map(|b| b.to_vec())))
                .collect::<Vec<_>>(),
        );
        Ok(())
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![vec![(2, Some(b"one".to_vec()))], vec![(2, Some(b"three".to_vec()))]]
    );
}

#[test]
fn codec_sweep_produces_identical_decoded_output() {
    let rows: Vec<(Option<&[u8]>, Option<&[u8]>)> = vec![
        (Some(b"alpha".as_slice()), Some(b"1".as_slice())),
        (Some(b"beta".as_slice()), None),
        (None, Some(b"3".as_slice())),
    ];

    let mut outputs = Vec::new();
    for codec_tag in [CODEC_NONE, CODEC_SNAPPY, CODEC_LZ4, CODEC_ZLIB] {
        let tmp = NamedTempFile::new().unwrap();
        write_two_columns(tmp.path(), codec_tag, &rows);
        outputs.push(read_all_rows(tmp.path()));
    }

    for pair in outputs.windows(2) {
        assert_eq!(pair[0], pair[1]);
    }
}
