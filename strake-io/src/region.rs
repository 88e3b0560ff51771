//! Scoped bump allocator used by the select engine to hold survivor values
//! across the filter and projection passes of one segment.

use std::sync::Mutex;

use bumpalo::Bump;

/// A pool of reusable [`Bump`] arenas. Acquiring a region is cheap once the
/// pool has warmed up (the arena is reused, not reallocated); releasing one
/// resets it rather than dropping its backing memory.
pub struct RegionPool {
    free: Mutex<Vec<Bump>>,
}

impl RegionPool {
    /// Build an empty pool.
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Borrow a region, reusing a released arena if one is available.
    pub fn acquire(&self) -> Region<'_> {
        let bump = self
            .free
            .lock()
            .expect("region pool mutex poisoned")
            .pop()
            .unwrap_or_default();
        Region {
            pool: self,
            bump: Some(bump),
        }
    }
}

impl Default for RegionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// One scoped arena, checked out from a [`RegionPool`]. All allocations made
/// through it share the region's lifetime and are released together when it
/// is dropped (the underlying arena is reset and returned to the pool, not
/// freed).
pub struct Region<'p> {
    pool: &'p RegionPool,
    bump: Option<Bump>,
}

impl<'p> Region<'p> {
    /// Copy `bytes` into the region, returning a reference valid for the
    /// region's lifetime.
    pub fn alloc_slice(&self, bytes: &[u8]) -> &[u8] {
        self.bump
            .as_ref()
            .expect("region used after release")
            .alloc_slice_copy(bytes)
    }
}

impl<'p> Drop for Region<'p> {
    fn drop(&mut self) {
        if let Some(mut bump) = self.bump.take() {
            bump.reset();
            if let Ok(mut free) = self.pool.free.lock() {
                free.push(bump);
            }
        }
    }
}
