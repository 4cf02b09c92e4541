//! Interval probability matrices.
//!
//! Columns index source-action pairs, rows index target states. Both
//! storage variants keep `lower` and `gap = upper - lower` (never `upper`
//! itself) plus the per-column lower-bound sum, because the optimization
//! kernel only ever consumes lower bounds, gaps, and the leftover mass
//! `1 - sum(lower)`. Precomputing these once removes them from every
//! Bellman step.
//!
//! [`DenseIntervalMatrix`] stores full columns; [`SparseIntervalMatrix`]
//! stores CSC columns assembled through `sprs`. Both hand out the same
//! [`ColumnView`], so the kernel in `imdp-algo` has one code path and a
//! further backend (for instance a GPU-resident matrix) only needs to
//! implement [`IntervalMatrix`].

pub mod dense;
pub mod sparse;

pub use dense::DenseIntervalMatrix;
pub use sparse::SparseIntervalMatrix;

use crate::error::AmbiguityError;
use crate::scalar::Scalar;

/// Target-row addressing of one column's entries.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRows<'a> {
    /// Dense column over `n` rows: entry `k` targets row `k`.
    Contiguous(usize),
    /// Sparse column: entry `k` targets `rows[k]`. Row indices are
    /// strictly increasing within a column.
    Indexed(&'a [usize]),
}

/// Borrowed view of one interval column.
///
/// Entries are addressed by position `0..nnz()`; positions are in
/// increasing target-row order for both storage variants, which is what
/// makes position-based tie-breaking in the sort deterministic.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a, T> {
    rows: ColumnRows<'a>,
    lower: &'a [T],
    gap: &'a [T],
}

impl<'a, T: Scalar> ColumnView<'a, T> {
    /// Assemble a view from raw parts. `lower` and `gap` must be equally
    /// long and match the row addressing.
    pub fn new(rows: ColumnRows<'a>, lower: &'a [T], gap: &'a [T]) -> Self {
        debug_assert_eq!(lower.len(), gap.len());
        if let ColumnRows::Indexed(r) = rows {
            debug_assert_eq!(r.len(), lower.len());
        }
        Self { rows, lower, gap }
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.lower.len()
    }

    /// Target row of entry `k`.
    #[inline]
    pub fn row(&self, k: usize) -> usize {
        match self.rows {
            ColumnRows::Contiguous(_) => k,
            ColumnRows::Indexed(rows) => rows[k],
        }
    }

    /// Lower probability bound of entry `k`.
    #[inline]
    pub fn lower(&self, k: usize) -> T {
        self.lower[k]
    }

    /// Interval width of entry `k`.
    #[inline]
    pub fn gap(&self, k: usize) -> T {
        self.gap[k]
    }

    /// Upper probability bound of entry `k`.
    #[inline]
    pub fn upper(&self, k: usize) -> T {
        self.lower[k] + self.gap[k]
    }
}

/// Common interface of dense and sparse interval matrices.
///
/// The associated scalar keeps model types free of phantom parameters;
/// algorithms name it as `M::Scalar`.
pub trait IntervalMatrix: Send + Sync {
    /// Scalar type of the probability bounds.
    type Scalar: Scalar;

    /// Number of target states.
    fn num_rows(&self) -> usize;

    /// Number of source-action columns.
    fn num_cols(&self) -> usize;

    /// Precomputed sum of the lower bounds of column `col`.
    fn sum_lower(&self, col: usize) -> Self::Scalar;

    /// View of column `col`.
    fn column(&self, col: usize) -> ColumnView<'_, Self::Scalar>;
}

/// Validate one column's bounds and return `(sum_lower, sum_upper)`.
///
/// `substochastic` relaxes the conditions for marginals with an implicit
/// sink row: the column may be empty and its upper bounds may sum below
/// one, because the sink absorbs the remaining mass.
pub(crate) fn validate_column<T: Scalar>(
    col: usize,
    rows: ColumnRows<'_>,
    lower: &[T],
    upper: &[T],
    substochastic: bool,
) -> Result<(T, T), AmbiguityError> {
    if lower.is_empty() && !substochastic {
        return Err(AmbiguityError::EmptyColumn { col });
    }

    let mut sum_lower = T::zero();
    let mut sum_upper = T::zero();
    for (k, (&lo, &up)) in lower.iter().zip(upper.iter()).enumerate() {
        let row = match rows {
            ColumnRows::Contiguous(_) => k,
            ColumnRows::Indexed(r) => r[k],
        };
        if lo < T::zero() || up > T::one() {
            return Err(AmbiguityError::EntryOutOfRange { col, row });
        }
        if lo > up {
            return Err(AmbiguityError::LowerAboveUpper { col, row });
        }
        sum_lower = sum_lower + lo;
        sum_upper = sum_upper + up;
    }

    if sum_lower > T::one() {
        return Err(AmbiguityError::LowerSumExceedsOne { col });
    }
    if !substochastic && sum_upper < T::one() {
        return Err(AmbiguityError::UpperSumBelowOne { col });
    }

    Ok((sum_lower, sum_upper))
}
