//! Factored interval Markov decision processes.
//!
//! The joint state space is a product `S_1 x ... x S_n` and the joint
//! action space a product `A_1 x ... x A_m`. Each state variable carries
//! an interval marginal over its next value, conditioned on a set of
//! parent variables; the joint ambiguity set is the product of the
//! marginal sets, which is what lets the Bellman operator contract one
//! axis at a time instead of materializing the joint matrix.

use crate::error::{AmbiguityError, ImdpError, ImdpResult};
use crate::index;
use crate::matrix::{DenseIntervalMatrix, IntervalMatrix};
use crate::scalar::{max, Scalar};

/// One state variable's interval marginal.
///
/// Columns are indexed by the Cartesian product of the parent variables,
/// action parents first and then state parents, the first parent most
/// significant. When `has_sink` is set the variable has one more value
/// than the matrix has rows: the last value is an implicit sink whose
/// probability is whatever the explicit rows leave unassigned, with
/// bounds derived from the column sums. This drops one row of storage
/// for the common pattern where the target of a specification is
/// absorbing.
#[derive(Debug, Clone)]
pub struct Marginal<T> {
    matrix: DenseIntervalMatrix<T>,
    action_parents: Vec<usize>,
    state_parents: Vec<usize>,
    has_sink: bool,
    sink_lower: Vec<T>,
    sink_gap: Vec<T>,
}

impl<T: Scalar> Marginal<T> {
    /// Marginal without a sink row: every column must already be able to
    /// carry full probability mass.
    pub fn try_new(
        matrix: DenseIntervalMatrix<T>,
        action_parents: Vec<usize>,
        state_parents: Vec<usize>,
    ) -> ImdpResult<Self> {
        for col in 0..matrix.num_cols() {
            if matrix.sum_upper(col) < T::one() {
                return Err(AmbiguityError::UpperSumBelowOne { col }.into());
            }
        }
        Ok(Self {
            matrix,
            action_parents,
            state_parents,
            has_sink: false,
            sink_lower: Vec::new(),
            sink_gap: Vec::new(),
        })
    }

    /// Marginal whose last value is an implicit sink row.
    pub fn try_new_with_sink(
        matrix: DenseIntervalMatrix<T>,
        action_parents: Vec<usize>,
        state_parents: Vec<usize>,
    ) -> ImdpResult<Self> {
        let mut sink_lower = Vec::with_capacity(matrix.num_cols());
        let mut sink_gap = Vec::with_capacity(matrix.num_cols());
        for col in 0..matrix.num_cols() {
            let slo = matrix.sum_lower(col);
            let sup = matrix.sum_upper(col);
            let lo = max(T::zero(), T::one() - sup);
            let up = T::one() - slo;
            sink_lower.push(lo);
            sink_gap.push(up - lo);
        }
        Ok(Self {
            matrix,
            action_parents,
            state_parents,
            has_sink: true,
            sink_lower,
            sink_gap,
        })
    }

    /// Number of values of the target variable, sink included.
    pub fn target_card(&self) -> usize {
        self.matrix.num_rows() + usize::from(self.has_sink)
    }

    /// The explicit interval matrix.
    pub fn matrix(&self) -> &DenseIntervalMatrix<T> {
        &self.matrix
    }

    /// Action parents, in column-index order.
    pub fn action_parents(&self) -> &[usize] {
        &self.action_parents
    }

    /// State parents, in column-index order.
    pub fn state_parents(&self) -> &[usize] {
        &self.state_parents
    }

    /// Whether the last value is an implicit sink.
    pub fn has_sink(&self) -> bool {
        self.has_sink
    }

    /// Bounds `(lower, gap)` of the sink row of `col`, if any.
    pub fn sink_entry(&self, col: usize) -> Option<(T, T)> {
        self.has_sink
            .then(|| (self.sink_lower[col], self.sink_gap[col]))
    }

    /// Sum of all lower bounds of `col`, sink included.
    pub fn sum_lower(&self, col: usize) -> T {
        if self.has_sink {
            self.matrix.sum_lower(col) + self.sink_lower[col]
        } else {
            self.matrix.sum_lower(col)
        }
    }
}

/// A factored interval Markov decision process.
#[derive(Debug, Clone)]
pub struct FactoredImdp<T> {
    state_dims: Vec<usize>,
    action_dims: Vec<usize>,
    marginals: Vec<Marginal<T>>,
    initial_states: Option<Vec<usize>>,
}

impl<T: Scalar> FactoredImdp<T> {
    /// Build a factored model, validating the dependency structure.
    pub fn new(
        state_dims: Vec<usize>,
        action_dims: Vec<usize>,
        marginals: Vec<Marginal<T>>,
    ) -> ImdpResult<Self> {
        if state_dims.is_empty() {
            return Err(ImdpError::ShapeMismatch(
                "a factored model needs at least one state variable".into(),
            ));
        }
        if state_dims.iter().chain(action_dims.iter()).any(|&d| d == 0) {
            return Err(ImdpError::ShapeMismatch(
                "state and action variables need at least one value".into(),
            ));
        }
        if marginals.len() != state_dims.len() {
            return Err(ImdpError::ShapeMismatch(format!(
                "{} state variables but {} marginals",
                state_dims.len(),
                marginals.len()
            )));
        }

        for (i, marginal) in marginals.iter().enumerate() {
            if marginal.target_card() != state_dims[i] {
                return Err(ImdpError::ShapeMismatch(format!(
                    "marginal {i} covers {} target values but variable {i} has {}",
                    marginal.target_card(),
                    state_dims[i]
                )));
            }
            let mut expected_cols = 1usize;
            for &p in marginal.action_parents() {
                let dim = *action_dims.get(p).ok_or_else(|| {
                    ImdpError::ShapeMismatch(format!(
                        "marginal {i} references unknown action variable {p}"
                    ))
                })?;
                expected_cols *= dim;
            }
            for &q in marginal.state_parents() {
                let dim = *state_dims.get(q).ok_or_else(|| {
                    ImdpError::ShapeMismatch(format!(
                        "marginal {i} references unknown state variable {q}"
                    ))
                })?;
                expected_cols *= dim;
            }
            if marginal.matrix().num_cols() != expected_cols {
                return Err(ImdpError::ShapeMismatch(format!(
                    "marginal {i} has {} columns but its parents span {expected_cols}",
                    marginal.matrix().num_cols()
                )));
            }
        }

        Ok(Self {
            state_dims,
            action_dims,
            marginals,
            initial_states: None,
        })
    }

    /// Restrict the set of initial joint states (flat indices).
    pub fn with_initial_states(mut self, initial: Vec<usize>) -> ImdpResult<Self> {
        let n = self.num_joint_states();
        if let Some(&bad) = initial.iter().find(|&&s| s >= n) {
            return Err(ImdpError::ShapeMismatch(format!(
                "initial state {bad} outside the {n}-state joint space"
            )));
        }
        self.initial_states = Some(initial);
        Ok(self)
    }

    /// Cardinalities of the state variables.
    pub fn state_dims(&self) -> &[usize] {
        &self.state_dims
    }

    /// Cardinalities of the action variables.
    pub fn action_dims(&self) -> &[usize] {
        &self.action_dims
    }

    /// The per-variable marginals.
    pub fn marginals(&self) -> &[Marginal<T>] {
        &self.marginals
    }

    /// Size of the joint state space.
    pub fn num_joint_states(&self) -> usize {
        index::size(&self.state_dims)
    }

    /// Size of the joint action space (one when there are no action
    /// variables).
    pub fn num_joint_actions(&self) -> usize {
        index::size(&self.action_dims)
    }

    /// Initial joint states, if restricted.
    pub fn initial_states(&self) -> Option<&[usize]> {
        self.initial_states.as_deref()
    }

    /// Column of marginal `i` selected by a joint action and source
    /// state, both as multi-indices.
    pub fn marginal_column(&self, i: usize, action: &[usize], state: &[usize]) -> usize {
        let marginal = &self.marginals[i];
        let mut col = 0;
        for &p in marginal.action_parents() {
            col = col * self.action_dims[p] + action[p];
        }
        for &q in marginal.state_parents() {
            col = col * self.state_dims[q] + state[q];
        }
        col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Rational64;

    fn rat(n: i64, d: i64) -> Rational64 {
        Rational64::new(n, d)
    }

    fn free_marginal(card: usize, cols: usize) -> Marginal<Rational64> {
        // Vacuous bounds: any distribution over `card` values.
        let lower = vec![rat(0, 1); card * cols];
        let upper = vec![rat(1, 1); card * cols];
        let matrix = DenseIntervalMatrix::try_new(card, cols, lower, upper).unwrap();
        Marginal::try_new(matrix, vec![], vec![]).unwrap()
    }

    #[test]
    fn test_joint_sizes() {
        let model = FactoredImdp::new(
            vec![2, 3],
            vec![],
            vec![free_marginal(2, 1), free_marginal(3, 1)],
        )
        .unwrap();
        assert_eq!(model.num_joint_states(), 6);
        assert_eq!(model.num_joint_actions(), 1);
    }

    #[test]
    fn test_marginal_card_mismatch() {
        let err = FactoredImdp::new(
            vec![2, 4],
            vec![],
            vec![free_marginal(2, 1), free_marginal(3, 1)],
        )
        .unwrap_err();
        assert!(matches!(err, ImdpError::ShapeMismatch(_)));
    }

    #[test]
    fn test_column_indexing_orders_action_parents_first() {
        // Marginal over variable 0 depending on action var 0 and state
        // vars 0 and 1: columns span 2 * 2 * 3 = 12.
        let card = 2;
        let cols = 12;
        let lower = vec![rat(0, 1); card * cols];
        let upper = vec![rat(1, 1); card * cols];
        let matrix = DenseIntervalMatrix::try_new(card, cols, lower, upper).unwrap();
        let marginal = Marginal::try_new(matrix, vec![0], vec![0, 1]).unwrap();

        let model = FactoredImdp::new(
            vec![2, 3],
            vec![2],
            vec![marginal, free_marginal(3, 1)],
        )
        .unwrap();

        // col = (a0 * 2 + s0) * 3 + s1
        assert_eq!(model.marginal_column(0, &[0], &[0, 0]), 0);
        assert_eq!(model.marginal_column(0, &[0], &[1, 2]), 5);
        assert_eq!(model.marginal_column(0, &[1], &[0, 1]), 7);
        assert_eq!(model.marginal_column(0, &[1], &[1, 2]), 11);
    }

    #[test]
    fn test_sink_bounds_derived_from_column_sums() {
        // One explicit row with bounds [1/4, 1/2]; the sink absorbs the
        // rest: lower 1/2, upper 3/4.
        let matrix = DenseIntervalMatrix::try_new_substochastic(
            1,
            1,
            vec![rat(1, 4)],
            vec![rat(1, 2)],
        )
        .unwrap();
        let marginal = Marginal::try_new_with_sink(matrix, vec![], vec![]).unwrap();
        assert_eq!(marginal.target_card(), 2);
        let (lo, gap) = marginal.sink_entry(0).unwrap();
        assert_eq!(lo, rat(1, 2));
        assert_eq!(gap, rat(1, 4));
        assert_eq!(marginal.sum_lower(0), rat(3, 4));
    }

    #[test]
    fn test_sinkless_marginal_must_cover_mass() {
        let matrix = DenseIntervalMatrix::try_new_substochastic(
            1,
            1,
            vec![rat(1, 4)],
            vec![rat(1, 2)],
        )
        .unwrap();
        let err = Marginal::try_new(matrix, vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            ImdpError::InvalidAmbiguitySet(AmbiguityError::UpperSumBelowOne { col: 0 })
        ));
    }
}
