//! Field decoder: the inverse of [`crate::field_encoder::FieldEncoder`].

use strake_format::constants::RUN_NULL_FLAG;
use strake_format::error::FormatError;
use strake_format::varint::decode_uleb128;

/// A cursor over the decoded values of one column in one segment.
///
/// Owns the decompressed block it was built from — the block is a freshly
/// decompressed `Vec<u8>` with no other owner, and owning it here avoids a
/// self-referential decoder-plus-buffer pair. [`FieldDecoder::peek`] and
/// [`FieldDecoder::get`] hand back a reference into the reconstructed value,
/// which is itself owned by the decoder; the reference is invalidated the
/// next time this decoder advances.
pub struct FieldDecoder {
    block: Vec<u8>,
    pos: usize,
    prev_non_null: Option<Vec<u8>>,
    current_value: Option<Vec<u8>>,
    remaining_repeat: u64,
    at_end: bool,
}

impl FieldDecoder {
    /// Build a decoder over a decompressed field block, taking ownership of
    /// it.
    pub fn new(block: Vec<u8>) -> Self {
        Self {
            block,
            pos: 0,
            prev_non_null: None,
            current_value: None,
            remaining_repeat: 0,
            at_end: false,
        }
    }

    /// True when no values remain: no bytes left to parse and the last run
    /// is exhausted.
    pub fn end(&mut self) -> Result<bool, FormatError> {
        self.load_next_run_if_needed()?;
        Ok(self.at_end)
    }

    /// Return a reference to the current value (or `None` for null) without
    /// consuming a repeat of the run.
    pub fn peek(&mut self) -> Result<Option<&[u8]>, FormatError> {
        self.load_next_run_if_needed()?;
        debug_assert!(!self.at_end, "peek() called past end of column");
        Ok(self.current_value.as_deref())
    }

    /// Return the current value (or `None` for null) and decrement the
    /// remaining repeat count of the current run.
    pub fn get(&mut self) -> Result<Option<&[u8]>, FormatError> {
        self.load_next_run_if_needed()?;
        debug_assert!(!self.at_end, "get() called past end of column");
        self.remaining_repeat -= 1;
        Ok(self.current_value.as_deref())
    }

    fn load_next_run_if_needed(&mut self) -> Result<(), FormatError> {
        if self.remaining_repeat > 0 || self.at_end {
            return Ok(());
        }
        if self.pos >= self.block.len() {
            self.at_end = true;
            return Ok(());
        }

        let remaining = &self.block[self.pos..];
        let (repeat_minus_1, n) = decode_uleb128(remaining)?;
        self.pos += n;

        let &flag = self.block.get(self.pos).ok_or(FormatError::UnexpectedEof)?;
        self.pos += 1;

        if flag & RUN_NULL_FLAG != 0 {
            self.current_value = None;
        } else {
            let remaining = &self.block[self.pos..];
            let (shared_prefix_len, n) = decode_uleb128(remaining)?;
            self.pos += n;
            let remaining = &self.block[self.pos..];
            let (suffix_len, n) = decode_uleb128(remaining)?;
            self.pos += n;

            let shared_prefix_len = shared_prefix_len as usize;
            let suffix_len = suffix_len as usize;
            let prev_len = self.prev_non_null.as_ref().map(Vec::len).unwrap_or(0);
            if shared_prefix_len > prev_len {
                return Err(FormatError::SharedPrefixTooLong {
                    shared: shared_prefix_len,
                    prev_len,
                });
            }
            if self.block.len() - self.pos < suffix_len {
                return Err(FormatError::UnexpectedEof);
            }

            let suffix = &self.block[self.pos..self.pos + suffix_len];
            let mut value = Vec::with_capacity(shared_prefix_len + suffix_len);
            if let Some(prev) = &self.prev_non_null {
                value.extend_from_slice(&prev[..shared_prefix_len]);
            }
            value.extend_from_slice(suffix);
            self.pos += suffix_len;

            self.prev_non_null = Some(value.clone());
            self.current_value = Some(value);
        }

        self.remaining_repeat = repeat_minus_1 + 1;
        Ok(())
    }
}
