//! The streaming select engine: applies column-ordered predicates over a
//! [`RowReader`], projecting only the requested columns for surviving rows.

use std::collections::HashSet;
use std::error::Error as StdError;

use crate::input::SegmentInput;
use crate::region::RegionPool;
use crate::row_reader::{ReadError, RowReader};

/// A per-value test applied to one column during the filter pass. Sees
/// `None` when the column is absent from the current segment.
pub trait Predicate: Send + Sync {
    /// Evaluate the predicate against one value.
    fn test(&self, value: Option<&[u8]>) -> Result<bool, Box<dyn StdError + Send + Sync>>;
}

impl<F> Predicate for F
where
    F: Fn(Option<&[u8]>) -> Result<bool, Box<dyn StdError + Send + Sync>> + Send + Sync,
{
    fn test(&self, value: Option<&[u8]>) -> Result<bool, Box<dyn StdError + Send + Sync>> {
        self(value)
    }
}

/// Errors from running [`execute`].
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// A failure reading rows out of the underlying segment stream.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// A predicate or the row callback signaled failure. Propagates after
    /// the engine releases its current region.
    #[error("predicate or callback failed: {0}")]
    Callback(#[source] Box<dyn StdError + Send + Sync>),
}

struct Survivor<'r> {
    row_index: u64,
    pairs: Vec<(u32, Option<&'r [u8]>)>,
}

/// Walk `reader`, keeping rows that pass every predicate in `filters` (ANDed
/// per column, across columns), and invoke `callback` once per surviving row
/// with its `selection` columns in ascending column_id order.
///
/// With no filters, every row survives (the fast path): the reader's filter
/// is simply set to `selection` and rows stream straight to the callback.
/// With filters, each segment is walked once per distinct filter column to
/// narrow a survivor list, then (if anything survived and any selected
/// column wasn't already materialized by a filter pass) once more to project
/// the remaining columns — see the module-level algorithm this mirrors in
/// the corresponding design notes.
pub fn execute<I, F>(
    reader: &mut RowReader<I>,
    selection: &[u32],
    filters: &[(u32, Box<dyn Predicate>)],
    region_pool: &RegionPool,
    mut callback: F,
) -> Result<(), SelectError>
where
    I: SegmentInput,
    F: for<'r> FnMut(&[(u32, Option<&'r [u8]>)]) -> Result<(), Box<dyn StdError + Send + Sync>>,
{
    let mut selection: Vec<u32> = selection.to_vec();
    selection.sort_unstable();
    selection.dedup();

    if filters.is_empty() {
        return execute_fast_path(reader, &selection, callback);
    }

    let mut sorted_filters: Vec<&(u32, Box<dyn Predicate>)> = filters.iter().collect();
    sorted_filters.sort_by_key(|(column_id, _)| *column_id);

    let mut filter_columns: Vec<u32> = sorted_filters.iter().map(|(c, _)| *c).collect();
    filter_columns.dedup();

    let filter_set: HashSet<u32> = filter_columns.iter().copied().collect();
    let unfiltered_selection: Vec<u32> = selection
        .iter()
        .copied()
        .filter(|c| !filter_set.contains(c))
        .collect();

    reader.set_column_filter(&[filter_columns[0]]);

    while !reader.end()? {
        let region = region_pool.acquire();
        let mut survivors: Vec<Survivor> = Vec::new();

        for (idx, &column_id) in filter_columns.iter().enumerate() {
            if idx > 0 {
                reader.set_column_filter(&[column_id]);
                reader.seek_to_start_of_segment()?;
            }

            let predicates: Vec<&Box<dyn Predicate>> = sorted_filters
                .iter()
                .filter(|(c, _)| *c == column_id)
                .map(|(_, p)| p)
                .collect();

            let keep_value = selection.contains(&column_id);

            if idx == 0 {
                let mut row_index = 0u64;
                while !reader.end_of_segment()? {
                    let value = reader.get(column_id)?;
                    let passed = test_all(&predicates, value.as_deref())?;
                    if passed {
                        let mut pairs = Vec::new();
                        if keep_value {
                            let copied = value.as_deref().map(|v| region.alloc_slice(v));
                            pairs.push((column_id, copied));
                        }
                        survivors.push(Survivor { row_index, pairs });
                    }
                    row_index += 1;
                }
            } else {
                let mut pending = survivors.into_iter().peekable();
                let mut narrowed = Vec::new();
                let mut row_index = 0u64;
                while !reader.end_of_segment()? {
                    let value = reader.get(column_id)?;
                    if pending.peek().map(|s| s.row_index) == Some(row_index) {
                        let mut survivor = pending.next().expect("peeked Some above");
                        let passed = test_all(&predicates, value.as_deref())?;
                        if passed {
                            if keep_value {
                                let copied = value.as_deref().map(|v| region.alloc_slice(v));
                                survivor.pairs.push((column_id, copied));
                            }
                            narrowed.push(survivor);
                        }
                    }
                    row_index += 1;
                }
                survivors = narrowed;
            }
        }

        if !survivors.is_empty() && !unfiltered_selection.is_empty() {
            reader.set_column_filter(&unfiltered_selection);
            reader.seek_to_start_of_segment()?;

            let mut next_survivor = 0usize;
            let mut row_index = 0u64;
            while next_survivor < survivors.len() && !reader.end_of_segment()? {
                let row = reader.get_row()?;
                if survivors[next_survivor].row_index == row_index {
                    for (column_id, value) in row {
                        let copied = value.as_deref().map(|v| region.alloc_slice(v));
                        survivors[next_survivor].pairs.push((column_id, copied));
                    }
                    next_survivor += 1;
                }
                row_index += 1;
            }
            while !reader.end_of_segment()? {
                reader.get_row()?;
            }
        }

        for survivor in &mut survivors {
            survivor.pairs.sort_by_key(|(column_id, _)| *column_id);
            callback(&survivor.pairs).map_err(SelectError::Callback)?;
        }

        reader.set_column_filter(&[filter_columns[0]]);
    }

    Ok(())
}

fn execute_fast_path<I, F>(
    reader: &mut RowReader<I>,
    selection: &[u32],
    mut callback: F,
) -> Result<(), SelectError>
where
    I: SegmentInput,
    F: for<'r> FnMut(&[(u32, Option<&'r [u8]>)]) -> Result<(), Box<dyn StdError + Send + Sync>>,
{
    reader.set_column_filter(selection);
    while !reader.end()? {
        let row = reader.get_row()?;
        let pairs: Vec<(u32, Option<&[u8]>)> =
            row.iter().map(|(c, v)| (*c, v.as_deref())).collect();
        callback(&pairs).map_err(SelectError::Callback)?;
    }
    Ok(())
}

fn test_all(
    predicates: &[&Box<dyn Predicate>],
    value: Option<&[u8]>,
) -> Result<bool, SelectError> {
    for predicate in predicates {
        if !predicate.test(value).map_err(SelectError::Callback)? {
            return Ok(false);
        }
    }
    Ok(true)
}
