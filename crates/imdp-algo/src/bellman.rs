//! Robust Bellman operator over single-variable models.
//!
//! One step maps `V_prev` to `V_cur`: for every source state, each
//! action's column runs through the assignment kernel against `V_prev`,
//! and the action expectations reduce by maximum or minimum. Updates use
//! strict improvement, so the first action in enumeration order wins
//! ties; together with the kernel's fixed summation order this makes the
//! step a deterministic function of its inputs for any worker count.
//!
//! Source states are independent, so the step parallelizes over them
//! with rayon. Each worker owns a private sort workspace and assignment
//! buffer; `V_prev` is shared read-only and every worker writes disjoint
//! entries of `V_cur` and the chosen-action array. Ambiguity sets are
//! validated at construction, so the hot loop is infallible.

use rayon::prelude::*;

use imdp_core::{
    Direction, ImdpError, ImdpResult, IntervalMatrix, IntervalMdp, Scalar, StrategyMode,
};

use crate::omax::extremal_expectation;
use crate::ordering::SortWorkspace;

/// A model family the iteration driver can step.
///
/// `policy`, when present, prescribes one action per state and replaces
/// the reduction for that step (used to evaluate a fixed strategy). The
/// trait is the seam for further backends: an implementation may run the
/// whole step elsewhere (for instance on a GPU) as long as it fills
/// `v_cur` and `chosen` deterministically.
pub trait RobustBellman: Send + Sync {
    type Scalar: Scalar;

    /// Number of (joint) states.
    fn num_states(&self) -> usize;

    /// Number of (joint) actions available in `state`.
    fn num_actions(&self, state: usize) -> usize;

    /// One robust Bellman step. Writes every entry of `v_cur` and
    /// `chosen`.
    fn step(
        &self,
        v_prev: &[Self::Scalar],
        v_cur: &mut [Self::Scalar],
        chosen: &mut [usize],
        direction: Direction,
        reduction: StrategyMode,
        policy: Option<&[usize]>,
    ) -> ImdpResult<()>;
}

pub(crate) fn check_step_shapes<B: RobustBellman + ?Sized>(
    model: &B,
    v_prev: &[B::Scalar],
    v_cur: &[B::Scalar],
    chosen: &[usize],
    policy: Option<&[usize]>,
) -> ImdpResult<()> {
    let n = model.num_states();
    if v_prev.len() != n || v_cur.len() != n || chosen.len() != n {
        return Err(ImdpError::ShapeMismatch(format!(
            "value buffers cover {}/{} entries but the model has {n} states",
            v_prev.len(),
            v_cur.len()
        )));
    }
    if let Some(policy) = policy {
        if policy.len() != n {
            return Err(ImdpError::ShapeMismatch(format!(
                "policy covers {} states but the model has {n}",
                policy.len()
            )));
        }
        for (s, &a) in policy.iter().enumerate() {
            if a >= model.num_actions(s) {
                return Err(ImdpError::ShapeMismatch(format!(
                    "policy picks action {a} in state {s}, which has {}",
                    model.num_actions(s)
                )));
            }
        }
    }
    Ok(())
}

#[inline]
pub(crate) fn improves<T: Scalar>(candidate: T, incumbent: T, reduction: StrategyMode) -> bool {
    match reduction {
        StrategyMode::Maximize => candidate > incumbent,
        StrategyMode::Minimize => candidate < incumbent,
    }
}

impl<M: IntervalMatrix> RobustBellman for IntervalMdp<M> {
    type Scalar = M::Scalar;

    fn num_states(&self) -> usize {
        IntervalMdp::num_states(self)
    }

    fn num_actions(&self, state: usize) -> usize {
        IntervalMdp::num_actions(self, state)
    }

    fn step(
        &self,
        v_prev: &[M::Scalar],
        v_cur: &mut [M::Scalar],
        chosen: &mut [usize],
        direction: Direction,
        reduction: StrategyMode,
        policy: Option<&[usize]>,
    ) -> ImdpResult<()> {
        check_step_shapes(self, v_prev, v_cur, chosen, policy)?;

        let transition = self.transition();
        let stateptr = self.stateptr();

        v_cur
            .par_iter_mut()
            .zip_eq(chosen.par_iter_mut())
            .enumerate()
            .for_each_init(
                || (SortWorkspace::new(), Vec::new()),
                |buffers, (s, (value, action))| {
                    let (ordering, assigned) = buffers;
                    let begin = stateptr[s];
                    let end = stateptr[s + 1];
                    let (first, rest) = match policy {
                        Some(p) => {
                            let j = begin + p[s];
                            (j, j + 1..j + 1)
                        }
                        None => (begin, begin + 1..end),
                    };

                    let mut best = extremal_expectation(
                        &transition.column(first),
                        transition.sum_lower(first),
                        None,
                        v_prev,
                        direction,
                        ordering,
                        assigned,
                    );
                    let mut best_action = first - begin;
                    for j in rest {
                        let e = extremal_expectation(
                            &transition.column(j),
                            transition.sum_lower(j),
                            None,
                            v_prev,
                            direction,
                            ordering,
                            assigned,
                        );
                        if improves(e, best, reduction) {
                            best = e;
                            best_action = j - begin;
                        }
                    }

                    *value = best;
                    *action = best_action;
                },
            );

        Ok(())
    }
}
