//! O-maximization: extremal expectations over interval ambiguity sets.
//!
//! Given a value vector `V` and one column of probability intervals, the
//! kernel computes `sup` (or `inf`) of `sum(gamma * V)` over the
//! feasible distributions `lower <= gamma <= upper, sum(gamma) = 1` in
//! closed form. The feasibility polytope is a box-constrained simplex,
//! so the extremum sits at a vertex reached greedily: start every entry
//! at its lower bound, then hand the leftover mass `1 - sum(lower)` to
//! the best-valued targets first (worst-valued for the infimum), each up
//! to its gap.
//!
//! The kernel is the inner loop of every Bellman step, which is why the
//! column hands it precomputed gaps and lower sums and why it works on
//! caller-supplied scratch buffers instead of allocating.

use imdp_core::{scalar, ColumnView, Direction, Scalar};

use crate::ordering::SortWorkspace;

/// Virtual entry for a marginal's implicit sink row.
///
/// Factored marginals may leave their last target value out of storage;
/// its probability is whatever the explicit rows leave unassigned. The
/// kernel treats it as one more entry at position `nnz` with these
/// bounds.
#[derive(Debug, Clone, Copy)]
pub struct SinkEntry<T> {
    pub lower: T,
    pub gap: T,
    pub row: usize,
}

/// Extremal expectation of `values` over one interval column.
///
/// `sum_lower` must be the column's full lower-bound sum, sink included
/// when `sink` is present. The assigned distribution is written into
/// `assigned` by entry position (the sink, if any, is the last
/// position); the ambiguity set and `values` are left untouched.
///
/// Summation order follows the sort permutation, so results are
/// bitwise-reproducible. With floating-point scalars any residual mass
/// left by rounding is folded into the last entry that received mass,
/// preserving `sum(assigned) = 1`; exact scalars leave no residue.
pub fn extremal_expectation<T: Scalar>(
    column: &ColumnView<'_, T>,
    sum_lower: T,
    sink: Option<SinkEntry<T>>,
    values: &[T],
    direction: Direction,
    ordering: &mut SortWorkspace,
    assigned: &mut Vec<T>,
) -> T {
    let nnz = column.nnz();
    let count = nnz + usize::from(sink.is_some());

    let row_at = |k: usize| -> usize {
        if k < nnz {
            column.row(k)
        } else {
            // Sink entries are present whenever k == nnz is reachable.
            sink.map(|s| s.row).unwrap_or(0)
        }
    };
    let lower_at = |k: usize| -> T {
        if k < nnz {
            column.lower(k)
        } else {
            sink.map(|s| s.lower).unwrap_or_else(T::zero)
        }
    };
    let gap_at = |k: usize| -> T {
        if k < nnz {
            column.gap(k)
        } else {
            sink.map(|s| s.gap).unwrap_or_else(T::zero)
        }
    };

    assigned.clear();
    assigned.resize(count, T::zero());

    let mut remaining = T::one() - sum_lower;
    let mut expectation = T::zero();
    let mut last_touched = None;

    let perm = ordering.order_by_values(count, direction, |k| values[row_at(k)]);
    for &k in perm {
        let delta = if remaining > T::zero() {
            scalar::min(gap_at(k), remaining)
        } else {
            T::zero()
        };
        let mass = lower_at(k) + delta;
        assigned[k] = mass;
        expectation = expectation + mass * values[row_at(k)];
        if delta > T::zero() {
            remaining = remaining - delta;
            last_touched = Some(k);
        }
    }

    // Rounding can leave a sliver of the unit mass unassigned; fold it
    // into the last filled entry so the distribution still sums to one.
    if remaining != T::zero() {
        if let Some(k) = last_touched {
            assigned[k] = assigned[k] + remaining;
            expectation = expectation + remaining * values[row_at(k)];
        }
    }

    expectation
}

#[cfg(test)]
mod tests {
    use super::*;
    use imdp_core::{DenseIntervalMatrix, IntervalMatrix, Rational64};

    fn rat(n: i64, d: i64) -> Rational64 {
        Rational64::new(n, d)
    }

    fn single_column(lower: Vec<f64>, upper: Vec<f64>) -> DenseIntervalMatrix<f64> {
        let rows = lower.len();
        DenseIntervalMatrix::try_new(rows, 1, lower, upper).unwrap()
    }

    #[test]
    fn test_upper_assignment() {
        // lower [0, .1, .2], upper [.5, .6, .7], V = [1, 2, 3]:
        // the supremum pushes mass onto state 3, then state 2.
        let m = single_column(vec![0.0, 0.1, 0.2], vec![0.5, 0.6, 0.7]);
        let values = [1.0, 2.0, 3.0];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        let e = extremal_expectation(
            &m.column(0),
            m.sum_lower(0),
            None,
            &values,
            Direction::Upper,
            &mut ws,
            &mut assigned,
        );
        assert!((e - 2.7).abs() < 1e-9);
        assert!((assigned[0] - 0.0).abs() < 1e-9);
        assert!((assigned[1] - 0.3).abs() < 1e-9);
        assert!((assigned[2] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_lower_assignment() {
        let m = single_column(vec![0.0, 0.1, 0.2], vec![0.5, 0.6, 0.7]);
        let values = [1.0, 2.0, 3.0];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        let e = extremal_expectation(
            &m.column(0),
            m.sum_lower(0),
            None,
            &values,
            Direction::Lower,
            &mut ws,
            &mut assigned,
        );
        assert!((e - 1.7).abs() < 1e-9);
        assert!((assigned[0] - 0.5).abs() < 1e-9);
        assert!((assigned[1] - 0.3).abs() < 1e-9);
        assert!((assigned[2] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_assignment_is_feasible_and_sums_to_one() {
        let m = single_column(vec![0.05, 0.0, 0.3, 0.1], vec![0.4, 0.35, 0.8, 0.5]);
        let values = [0.9, 0.2, 0.4, 0.7];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        for direction in [Direction::Lower, Direction::Upper] {
            let col = m.column(0);
            extremal_expectation(
                &col,
                m.sum_lower(0),
                None,
                &values,
                direction,
                &mut ws,
                &mut assigned,
            );
            let total: f64 = assigned.iter().sum();
            assert!((total - 1.0).abs() < 1e-12);
            for k in 0..col.nnz() {
                assert!(assigned[k] >= col.lower(k) - 1e-12);
                assert!(assigned[k] <= col.upper(k) + 1e-12);
            }
        }
    }

    #[test]
    fn test_point_column_ignores_direction() {
        // Zero gaps: the feasible set is a single distribution.
        let m = single_column(vec![0.25, 0.75], vec![0.25, 0.75]);
        let values = [2.0, 6.0];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        for direction in [Direction::Lower, Direction::Upper] {
            let e = extremal_expectation(
                &m.column(0),
                m.sum_lower(0),
                None,
                &values,
                direction,
                &mut ws,
                &mut assigned,
            );
            assert!((e - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_saturated_lower_bounds_pin_the_distribution() {
        // sum(lower) = 1: no mass left to move despite open gaps.
        let m = single_column(vec![0.5, 0.5], vec![0.9, 0.9]);
        let values = [0.0, 10.0];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        let e = extremal_expectation(
            &m.column(0),
            m.sum_lower(0),
            None,
            &values,
            Direction::Upper,
            &mut ws,
            &mut assigned,
        );
        assert!((e - 5.0).abs() < 1e-12);
        assert_eq!(assigned, vec![0.5, 0.5]);
    }

    #[test]
    fn test_exact_rational_assignment() {
        let m = DenseIntervalMatrix::try_new(
            3,
            1,
            vec![rat(1, 5), rat(1, 10), rat(1, 5)],
            vec![rat(2, 5), rat(1, 2), rat(3, 5)],
        )
        .unwrap();
        let values = [rat(0, 1), rat(1, 1), rat(2, 1)];
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        let e = extremal_expectation(
            &m.column(0),
            m.sum_lower(0),
            None,
            &values,
            Direction::Upper,
            &mut ws,
            &mut assigned,
        );
        // Mass settles at [1/5, 1/5, 3/5]; expectation 7/5 exactly.
        assert_eq!(e, rat(7, 5));
        assert_eq!(assigned, vec![rat(1, 5), rat(1, 5), rat(3, 5)]);
        assert_eq!(
            assigned.iter().fold(rat(0, 1), |a, &b| a + b),
            rat(1, 1)
        );
    }

    #[test]
    fn test_sink_entry_takes_mass() {
        // One explicit row [1/4, 1/2] plus a sink holding the rest; the
        // sink has the higher value, so the supremum fills it.
        let m = DenseIntervalMatrix::try_new_substochastic(
            1,
            1,
            vec![rat(1, 4)],
            vec![rat(1, 2)],
        )
        .unwrap();
        let sink = SinkEntry {
            lower: rat(1, 2),
            gap: rat(1, 4),
            row: 1,
        };
        let values = [rat(0, 1), rat(1, 1)];
        let sum_lower = m.sum_lower(0) + sink.lower;
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        let e = extremal_expectation(
            &m.column(0),
            sum_lower,
            Some(sink),
            &values,
            Direction::Upper,
            &mut ws,
            &mut assigned,
        );
        assert_eq!(e, rat(3, 4));
        assert_eq!(assigned, vec![rat(1, 4), rat(3, 4)]);
    }
}
