//! Sparse (CSC) interval matrix assembled through `sprs`.

use sprs::{CsMat, TriMat};

use super::{validate_column, ColumnRows, ColumnView, IntervalMatrix};
use crate::error::{AmbiguityError, ImdpError, ImdpResult};
use crate::scalar::Scalar;

/// Sparse interval probability matrix in CSC layout.
///
/// `lower` and `gap` share one sparsity pattern (`colptr`, `rows`), so a
/// scratch assignment buffer with the same pattern can be indexed by
/// entry position. Assembly goes through `sprs` triplet matrices, which
/// sort row indices and merge duplicates; the flat arrays are extracted
/// once at construction so the inner loops read contiguous slices per
/// column.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseIntervalMatrix<T> {
    num_rows: usize,
    num_cols: usize,
    colptr: Vec<usize>,
    rows: Vec<usize>,
    lower: Vec<T>,
    gap: Vec<T>,
    sum_lower: Vec<T>,
}

impl<T: Scalar> SparseIntervalMatrix<T> {
    /// Build from `(row, col, lower, upper)` triplets.
    pub fn try_from_triplets(
        num_rows: usize,
        num_cols: usize,
        entries: &[(usize, usize, T, T)],
    ) -> ImdpResult<Self> {
        for &(row, col, _, _) in entries {
            if row >= num_rows || col >= num_cols {
                return Err(ImdpError::ShapeMismatch(format!(
                    "triplet ({row}, {col}) outside a {num_rows}x{num_cols} matrix"
                )));
            }
        }

        let mut lower_tri = TriMat::new((num_rows, num_cols));
        let mut upper_tri = TriMat::new((num_rows, num_cols));
        for &(row, col, lo, up) in entries {
            lower_tri.add_triplet(row, col, lo);
            upper_tri.add_triplet(row, col, up);
        }

        let lower: CsMat<T> = lower_tri.to_csc();
        let upper: CsMat<T> = upper_tri.to_csc();
        Self::try_new(lower, upper)
    }

    /// Build from a pair of CSC matrices with identical sparsity
    /// patterns. Rejects mismatched shapes or patterns and any violated
    /// ambiguity-set invariant.
    pub fn try_new(lower: CsMat<T>, upper: CsMat<T>) -> ImdpResult<Self> {
        if lower.shape() != upper.shape() {
            return Err(ImdpError::ShapeMismatch(format!(
                "lower is {:?} but upper is {:?}",
                lower.shape(),
                upper.shape()
            )));
        }
        if !lower.is_csc() || !upper.is_csc() {
            return Err(ImdpError::ShapeMismatch(
                "sparse interval matrices require CSC storage".into(),
            ));
        }

        let (num_rows, num_cols) = lower.shape();
        let nnz = lower.nnz();
        if upper.nnz() != nnz {
            return Err(AmbiguityError::PatternMismatch.into());
        }

        let mut colptr = Vec::with_capacity(num_cols + 1);
        let mut rows = Vec::with_capacity(nnz);
        let mut lower_data = Vec::with_capacity(nnz);
        let mut gap_data = Vec::with_capacity(nnz);
        colptr.push(0);

        for (lo_col, up_col) in lower.outer_iterator().zip(upper.outer_iterator()) {
            if lo_col.indices() != up_col.indices() {
                return Err(AmbiguityError::PatternMismatch.into());
            }
            for ((row, &lo), &up) in lo_col.iter().zip(up_col.data().iter()) {
                rows.push(row);
                lower_data.push(lo);
                gap_data.push(up - lo);
            }
            colptr.push(rows.len());
        }

        let mut sum_lower = Vec::with_capacity(num_cols);
        for col in 0..num_cols {
            let range = colptr[col]..colptr[col + 1];
            let upper_col: Vec<T> = lower_data[range.clone()]
                .iter()
                .zip(gap_data[range.clone()].iter())
                .map(|(&lo, &g)| lo + g)
                .collect();
            let (slo, _) = validate_column(
                col,
                ColumnRows::Indexed(&rows[range.clone()]),
                &lower_data[range],
                &upper_col,
                false,
            )?;
            sum_lower.push(slo);
        }

        Ok(Self {
            num_rows,
            num_cols,
            colptr,
            rows,
            lower: lower_data,
            gap: gap_data,
            sum_lower,
        })
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the stored entries of column `col` as
    /// `(row, lower, upper)`. Used by the format writers.
    pub fn col_entries(&self, col: usize) -> impl Iterator<Item = (usize, T, T)> + '_ {
        let range = self.colptr[col]..self.colptr[col + 1];
        let rows = &self.rows[range.clone()];
        let lower = &self.lower[range.clone()];
        let gap = &self.gap[range];
        rows.iter()
            .zip(lower.iter().zip(gap.iter()))
            .map(|(&row, (&lo, &g))| (row, lo, lo + g))
    }
}

impl<T: Scalar> IntervalMatrix for SparseIntervalMatrix<T> {
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
        let range = self.colptr[col]..self.colptr[col + 1];
        ColumnView::new(
            ColumnRows::Indexed(&self.rows[range.clone()]),
            &self.lower[range.clone()],
            &self.gap[range],
        )
    }
}
