//! Ordering workspace for the greedy assignment kernel.

use std::cmp::Ordering;

use imdp_core::{Direction, Scalar};

/// Reusable permutation buffer that orders one column's entries by the
/// value of their target state.
///
/// Ascending for [`Direction::Lower`] (fill the cheapest targets first),
/// descending for [`Direction::Upper`]. Ties break on entry position in
/// both directions; positions are in increasing target-row order for
/// every storage variant, so the assignment is reproducible whatever the
/// worker count.
#[derive(Debug, Default)]
pub struct SortWorkspace {
    perm: Vec<usize>,
}

impl SortWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort entry positions `0..count` by `value_at` and return the
    /// permutation. The buffer is reused across calls.
    pub fn order_by_values<T: Scalar>(
        &mut self,
        count: usize,
        direction: Direction,
        value_at: impl Fn(usize) -> T,
    ) -> &[usize] {
        self.perm.clear();
        self.perm.extend(0..count);
        match direction {
            Direction::Lower => self.perm.sort_unstable_by(|&a, &b| {
                value_at(a)
                    .partial_cmp(&value_at(b))
                    .unwrap_or(Ordering::Equal)
                    .then(a.cmp(&b))
            }),
            Direction::Upper => self.perm.sort_unstable_by(|&a, &b| {
                value_at(b)
                    .partial_cmp(&value_at(a))
                    .unwrap_or(Ordering::Equal)
                    .then(a.cmp(&b))
            }),
        }
        &self.perm
    }
}
