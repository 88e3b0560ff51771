//! Dispatches per-column block decompression across an abstract executor
//! (sequential by default, optionally a `rayon` pool). Not observable to
//! callers: output order always matches input order.

use strake_codec::codec::{Codec, UNKNOWN_SIZE};
use strake_format::error::FormatError;

/// Decompresses a segment's requested field blocks. Implementations may run
/// the work sequentially or fan it out to a worker pool; either way the
/// returned vector preserves the input order.
pub trait Executor: Send + Sync {
    /// Decompress every `(column_id, compressed_block)` pair in `blocks`
    /// using `codec`, returning `(column_id, raw_block)` pairs in the same
    /// order.
    fn decompress_all(
        &self,
        codec: &dyn Codec,
        blocks: Vec<(u32, Vec<u8>)>,
    ) -> Result<Vec<(u32, Vec<u8>)>, FormatError>;
}

/// Decompresses one block at a time on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn decompress_all(
        &self,
        codec: &dyn Codec,
        blocks: Vec<(u32, Vec<u8>)>,
    ) -> Result<Vec<(u32, Vec<u8>)>, FormatError> {
        blocks
            .into_iter()
            .map(|(column_id, compressed)| {
                let raw = codec.decompress(&compressed, UNKNOWN_SIZE)?;
                Ok((column_id, raw))
            })
            .collect()
    }
}

/// Decompresses blocks across the global `rayon` pool. Worthwhile once a
/// segment has enough columns (or big enough blocks) that decompression, not
/// scheduling overhead, dominates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RayonExecutor;

impl Executor for RayonExecutor {
    fn decompress_all(
        &self,
        codec: &dyn Codec,
        blocks: Vec<(u32, Vec<u8>)>,
    ) -> Result<Vec<(u32, Vec<u8>)>, FormatError> {
        use rayon::prelude::*;
        blocks
            .into_par_iter()
            .map(|(column_id, compressed)| {
                let raw = codec.decompress(&compressed, UNKNOWN_SIZE)?;
                Ok((column_id, raw))
            })
            .collect()
    }
}
