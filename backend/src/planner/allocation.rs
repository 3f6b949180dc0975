//! Contiguous image ranges per spec row.
//!
//! Row *i* takes the next `step_i` images of the pool: the first row gets
//! `[0, step_0 - 1]`, every later row starts right after the previous end.
//! Ranges are clamped to the pool; a short pool means later rows get fewer
//! (possibly zero) images, never an error.

use std::ops::Range;

/// Inclusive index range into the image pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub begin: usize,
    pub end: usize,
}

impl Allocation {
    /// Range of `step` images starting at `offset`. `step` must be >= 1.
    ///
    /// Step counts come straight from the spreadsheet, so bounds saturate at
    /// `usize::MAX` instead of overflowing.
    pub fn at(offset: usize, step: usize) -> Self {
        debug_assert!(step >= 1);
        Self {
            begin: offset,
            end: offset.saturating_add(step.saturating_sub(1)),
        }
    }

    /// Requested image count.
    pub fn requested(&self) -> usize {
        (self.end - self.begin).saturating_add(1)
    }

    /// Offset where the next row starts.
    pub fn next_offset(&self) -> usize {
        self.end.saturating_add(1)
    }

    /// Pool indices actually available, as a half-open range.
    pub fn clamped(&self, pool_len: usize) -> Range<usize> {
        let start = self.begin.min(pool_len);
        let stop = self.end.saturating_add(1).min(pool_len);
        start..stop
    }
}

/// Allocations for a sequence of step counts.
pub fn allocate(steps: &[usize]) -> Vec<Allocation> {
    let mut offset = 0;
    steps
        .iter()
        .map(|&step| {
            let alloc = Allocation::at(offset, step);
            offset = alloc.next_offset();
            alloc
        })
        .collect()
}
