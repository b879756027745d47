//! Execution policy for the layer's data-parallel loops.
//!
//! Every loop in the layer either writes disjoint output slots or is a sum
//! reduction, so both run on rayon without locks. Parallel sums are
//! fork-join reductions: the order in which partial sums combine depends on
//! how rayon splits the range, so results can differ in the last bits between
//! runs with different thread counts.

use crate::utils::precision::Accum;
use rayon::prelude::*;
use serde::Deserialize;

/// Smallest amount of work (in scalar terms) handed to rayon by default.
pub const DEFAULT_MIN_PARALLEL_LEN: usize = 1024;

/// How the layer runs its loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Plain iterators in index order; bit-reproducible.
    Sequential,
    /// rayon iterators for loops covering at least `min_len` scalar terms.
    Parallel { min_len: usize },
}

impl Default for Execution {
    fn default() -> Self {
        Execution::Parallel {
            min_len: DEFAULT_MIN_PARALLEL_LEN,
        }
    }
}

impl Execution {
    /// Whether a loop touching `work` scalar terms should go to rayon.
    pub fn is_parallel_for(self, work: usize) -> bool {
        match self {
            Execution::Sequential => false,
            Execution::Parallel { min_len } => work >= min_len.max(1),
        }
    }
}

/// Sum `term(i)` for `i` in `0..len`.
pub fn reduce_sum<F>(len: usize, execution: Execution, term: F) -> Accum
where
    F: Fn(usize) -> Accum + Sync + Send,
{
    if execution.is_parallel_for(len) {
        (0..len).into_par_iter().map(term).sum()
    } else {
        (0..len).map(term).sum()
    }
}

/// Call `f(i, &mut slots[i])` for every slot. `work_per_slot` estimates the
/// scalar work behind one call and feeds the parallel threshold.
pub fn for_each_slot<T, F>(slots: &mut [T], work_per_slot: usize, execution: Execution, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    let work = slots.len().saturating_mul(work_per_slot.max(1));
    if execution.is_parallel_for(work) {
        slots
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| f(i, slot));
    } else {
        slots.iter_mut().enumerate().for_each(|(i, slot)| f(i, slot));
    }
}

/// Call `f(k, row)` for every `row_len`-wide row of a row-major buffer.
pub fn for_each_row<T, F>(data: &mut [T], row_len: usize, execution: Execution, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if row_len == 0 {
        return;
    }
    if execution.is_parallel_for(data.len()) {
        data.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(k, row)| f(k, row));
    } else {
        data.chunks_mut(row_len)
            .enumerate()
            .for_each(|(k, row)| f(k, row));
    }
}
