//! Dense column-major interval matrix.

use super::{validate_column, ColumnRows, ColumnView, IntervalMatrix};
use crate::error::{ImdpError, ImdpResult};
use crate::scalar::Scalar;

/// Dense interval probability matrix in column-major layout.
///
/// Suited to small target spaces and to the marginals of factored
/// models, where every column is short and fully populated. Stores
/// `lower` and `gap` contiguously per column plus the per-column
/// lower-bound sums.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseIntervalMatrix<T> {
    num_rows: usize,
    num_cols: usize,
    lower: Vec<T>,
    gap: Vec<T>,
    sum_lower: Vec<T>,
}

impl<T: Scalar> DenseIntervalMatrix<T> {
    /// Build from column-major `lower` and `upper` vectors of length
    /// `num_rows * num_cols`, validating every ambiguity-set invariant.
    pub fn try_new(
        num_rows: usize,
        num_cols: usize,
        lower: Vec<T>,
        upper: Vec<T>,
    ) -> ImdpResult<Self> {
        Self::build(num_rows, num_cols, lower, upper, false)
    }

    /// Build a substochastic matrix: columns may leave probability mass
    /// unassigned. Used for marginals with an implicit sink row, which
    /// absorbs the leftover mass.
    pub fn try_new_substochastic(
        num_rows: usize,
        num_cols: usize,
        lower: Vec<T>,
        upper: Vec<T>,
    ) -> ImdpResult<Self> {
        Self::build(num_rows, num_cols, lower, upper, true)
    }

    fn build(
        num_rows: usize,
        num_cols: usize,
        lower: Vec<T>,
        mut upper: Vec<T>,
        substochastic: bool,
    ) -> ImdpResult<Self> {
        if lower.len() != num_rows * num_cols || upper.len() != num_rows * num_cols {
            return Err(ImdpError::ShapeMismatch(format!(
                "dense interval matrix expects {} entries per bound, got {} lower and {} upper",
                num_rows * num_cols,
                lower.len(),
                upper.len()
            )));
        }

        let mut sum_lower = Vec::with_capacity(num_cols);
        for col in 0..num_cols {
            let range = col * num_rows..(col + 1) * num_rows;
            let (slo, _) = validate_column(
                col,
                ColumnRows::Contiguous(num_rows),
                &lower[range.clone()],
                &upper[range],
                substochastic,
            )?;
            sum_lower.push(slo);
        }

        // Reuse the upper buffer as gap storage.
        for (g, &lo) in upper.iter_mut().zip(lower.iter()) {
            *g = *g - lo;
        }

        Ok(Self {
            num_rows,
            num_cols,
            lower,
            gap: upper,
            sum_lower,
        })
    }

    /// Sum of the upper bounds of column `col`.
    pub fn sum_upper(&self, col: usize) -> T {
        let range = col * self.num_rows..(col + 1) * self.num_rows;
        self.lower[range.clone()]
            .iter()
            .zip(self.gap[range].iter())
            .fold(T::zero(), |acc, (&lo, &g)| acc + lo + g)
    }
}

impl<T: Scalar> IntervalMatrix for DenseIntervalMatrix<T> {
    type Scalar = T;

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn sum_lower(&self, col: usize) -> T {
        self.sum_lower[col]
    }

    fn column(&self, col: usize) -> ColumnView<'_, T> {
        let range = col * self.num_rows..(col + 1) * self.num_rows;
        ColumnView::new(
            ColumnRows::Contiguous(self.num_rows),
            &self.lower[range.clone()],
            &self.gap[range],
        )
    }
}
