//! Interval Markov decision processes over one joint state space.

use crate::error::{ImdpError, ImdpResult};
use crate::matrix::IntervalMatrix;

/// An interval Markov decision process.
///
/// The transition matrix has one column per source-action pair and one
/// row per target state. `stateptr[s]..stateptr[s + 1]` are the columns
/// belonging to source state `s`, so states may have different numbers
/// of actions; an interval Markov chain is the special case of exactly
/// one column per state (see [`IntervalMdp::chain`]).
#[derive(Debug, Clone)]
pub struct IntervalMdp<M> {
    transition: M,
    stateptr: Vec<usize>,
    initial_states: Option<Vec<usize>>,
}

impl<M: IntervalMatrix> IntervalMdp<M> {
    /// Build an IMDP from a transition matrix and its state pointer.
    ///
    /// The pointer must start at zero, be strictly increasing (every
    /// state needs at least one action), and end at the matrix's column
    /// count; the matrix must be square in the sense that targets and
    /// sources range over the same states.
    pub fn new(transition: M, stateptr: Vec<usize>) -> ImdpResult<Self> {
        let num_states = stateptr.len().saturating_sub(1);
        if stateptr.len() < 2 || stateptr[0] != 0 {
            return Err(ImdpError::ShapeMismatch(
                "stateptr must start at zero and cover at least one state".into(),
            ));
        }
        for s in 0..num_states {
            if stateptr[s + 1] <= stateptr[s] {
                return Err(ImdpError::ShapeMismatch(format!(
                    "state {s} has an empty action set"
                )));
            }
        }
        if stateptr[num_states] != transition.num_cols() {
            return Err(ImdpError::ShapeMismatch(format!(
                "stateptr covers {} columns but the matrix has {}",
                stateptr[num_states],
                transition.num_cols()
            )));
        }
        if transition.num_rows() != num_states {
            return Err(ImdpError::ShapeMismatch(format!(
                "matrix targets {} states but stateptr describes {}",
                transition.num_rows(),
                num_states
            )));
        }

        Ok(Self {
            transition,
            stateptr,
            initial_states: None,
        })
    }

    /// Build an interval Markov chain: one action per state.
    pub fn chain(transition: M) -> ImdpResult<Self> {
        if transition.num_rows() != transition.num_cols() {
            return Err(ImdpError::ShapeMismatch(format!(
                "a Markov chain needs a square matrix, got {}x{}",
                transition.num_rows(),
                transition.num_cols()
            )));
        }
        let stateptr = (0..=transition.num_rows()).collect();
        Self::new(transition, stateptr)
    }

    /// Restrict the set of initial states (checked against the state
    /// count).
    pub fn with_initial_states(mut self, initial: Vec<usize>) -> ImdpResult<Self> {
        let n = self.num_states();
        if let Some(&bad) = initial.iter().find(|&&s| s >= n) {
            return Err(ImdpError::ShapeMismatch(format!(
                "initial state {bad} outside the {n}-state space"
            )));
        }
        self.initial_states = Some(initial);
        Ok(self)
    }

    /// Number of states.
    pub fn num_states(&self) -> usize {
        self.stateptr.len() - 1
    }

    /// Number of actions available in `state`.
    pub fn num_actions(&self, state: usize) -> usize {
        self.stateptr[state + 1] - self.stateptr[state]
    }

    /// Largest action count over all states.
    pub fn max_actions(&self) -> usize {
        (0..self.num_states())
            .map(|s| self.num_actions(s))
            .max()
            .unwrap_or(0)
    }

    /// Total number of source-action columns.
    pub fn num_choices(&self) -> usize {
        self.transition.num_cols()
    }

    /// Column index of `(state, action)`.
    pub fn column_of(&self, state: usize, action: usize) -> usize {
        self.stateptr[state] + action
    }

    /// The transition matrix.
    pub fn transition(&self) -> &M {
        &self.transition
    }

    /// The state pointer table.
    pub fn stateptr(&self) -> &[usize] {
        &self.stateptr
    }

    /// Initial states, if restricted.
    pub fn initial_states(&self) -> Option<&[usize]> {
        self.initial_states.as_deref()
    }
}
