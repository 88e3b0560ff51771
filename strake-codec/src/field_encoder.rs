//! Field encoder: run-length + shared-prefix encoding for one column of one
//! segment.

use smallvec::SmallVec;
use strake_format::constants::RUN_NULL_FLAG;
use strake_format::varint::encode_uleb128;

#[derive(Debug)]
enum RunValue {
    Null,
    NonNull(Vec<u8>),
}

#[derive(Debug)]
struct PendingRun {
    value: RunValue,
    repeat: u64,
}

/// Accumulates values for one column in one segment, producing a single
/// encoded byte block on [`FieldEncoder::finalize`].
///
/// Maintains only the value of the run currently open and how many times it
/// has repeated, plus the most recently *committed* non-null value (needed
/// to compute `shared_prefix_len` for the next non-null run).
#[derive(Debug, Default)]
pub struct FieldEncoder {
    buf: Vec<u8>,
    pending: Option<PendingRun>,
    prev_committed_non_null: Option<Vec<u8>>,
}

impl FieldEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one non-null value.
    pub fn put(&mut self, bytes: &[u8]) {
        let extends = matches!(
            &self.pending,
            Some(PendingRun { value: RunValue::NonNull(v), .. }) if v.as_slice() == bytes
        );
        if extends {
            self.pending.as_mut().unwrap().repeat += 1;
        } else {
            self.commit_pending();
            self.pending = Some(PendingRun {
                value: RunValue::NonNull(bytes.to_vec()),
                repeat: 1,
            });
        }
    }

    /// Append one null value.
    pub fn put_null(&mut self) {
        let extends = matches!(&self.pending, Some(PendingRun { value: RunValue::Null, .. }));
        if extends {
            self.pending.as_mut().unwrap().repeat += 1;
        } else {
            self.commit_pending();
            self.pending = Some(PendingRun {
                value: RunValue::Null,
                repeat: 1,
            });
        }
    }

    fn commit_pending(&mut self) {
        let Some(run) = self.pending.take() else {
            return;
        };

        self.buf
            .extend_from_slice(&encode_uleb128(run.repeat - 1));

        match run.value {
            RunValue::Null => {
                self.buf.push(RUN_NULL_FLAG);
            }
            RunValue::NonNull(value) => {
                self.buf.push(0);

                let shared_prefix_len = match &self.prev_committed_non_null {
                    Some(prev) => common_prefix_len(prev, &value),
                    None => 0,
                };
                let suffix = &value[shared_prefix_len..];

                self.buf
                    .extend_from_slice(&encode_uleb128(shared_prefix_len as u64));
                self.buf
                    .extend_from_slice(&encode_uleb128(suffix.len() as u64));
                self.buf.extend_from_slice(suffix);

                self.prev_committed_non_null = Some(value);
            }
        }
    }

    /// Commit the pending run and return the raw (uncompressed) encoding
    /// stream. An encoder that received no values produces an empty stream.
    pub fn finalize(mut self) -> Vec<u8> {
        self.commit_pending();
        self.buf
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Scratch buffer type used by callers building up a run of column values
/// before handing them to [`FieldEncoder::put`]; kept as a small-vector
/// optimization since most column values are short.
pub type ValueBuf = SmallVec<[u8; 32]>;
