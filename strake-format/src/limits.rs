//! Defensive limits on untrusted segment data

/// Ceilings enforced while parsing a segment header and its field blocks, so
/// that a corrupt or adversarial file cannot force unbounded allocation
/// before any payload byte has been validated.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum number of columns a single segment may declare.
    pub max_columns_per_segment: usize,
    /// Maximum compressed size of one field block.
    pub max_compressed_block_size: usize,
    /// Maximum uncompressed size one field block may expand to.
    pub max_uncompressed_block_size: usize,
    /// Maximum byte length of a single varint (10 bytes covers a u64).
    pub max_varint_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_columns_per_segment: 65_535,
            max_compressed_block_size: 256 * 1024 * 1024,
            max_uncompressed_block_size: 512 * 1024 * 1024,
            max_varint_bytes: 10,
        }
    }
}
