//! Recursive tensor Bellman for factored models.
//!
//! The joint transition matrix of a factored model has `|S|^2` entries
//! and is never materialized. Because the ambiguity set factorizes per
//! state variable, the expectation of `V` contracts one axis at a time:
//! starting from the full value tensor, the innermost (fastest-varying)
//! axis is assigned by the kernel once per remaining outer multi-index,
//! producing a tensor with one fewer axis, until a scalar per joint
//! action remains. Every marginal uses the same direction; actions then
//! reduce exactly as in the single-variable operator.
//!
//! An implicit sink row enters each contraction as one virtual entry, so
//! the assigned distribution still sums to one without storing the sink.
//! Workers keep two ping-pong scratch tensors, one axis smaller than
//! `V`, reused across source states.

use rayon::prelude::*;

use imdp_core::{index, Direction, FactoredImdp, ImdpResult, IntervalMatrix, Marginal, Scalar, StrategyMode};

use crate::bellman::{check_step_shapes, improves, RobustBellman};
use crate::omax::{extremal_expectation, SinkEntry};
use crate::ordering::SortWorkspace;

struct Workspace<T> {
    ordering: SortWorkspace,
    assigned: Vec<T>,
    front: Vec<T>,
    back: Vec<T>,
    state_idx: Vec<usize>,
    action_idx: Vec<usize>,
}

impl<T: Scalar> Workspace<T> {
    fn new(num_state_vars: usize, num_action_vars: usize) -> Self {
        Self {
            ordering: SortWorkspace::new(),
            assigned: Vec::new(),
            front: Vec::new(),
            back: Vec::new(),
            state_idx: vec![0; num_state_vars],
            action_idx: vec![0; num_action_vars],
        }
    }
}

/// Contract the last remaining axis: one kernel call per chunk of
/// `axis_len` entries.
fn contract_axis<T: Scalar>(
    marginal: &Marginal<T>,
    col: usize,
    axis_len: usize,
    input: &[T],
    direction: Direction,
    ordering: &mut SortWorkspace,
    assigned: &mut Vec<T>,
    output: &mut Vec<T>,
) {
    let view = marginal.matrix().column(col);
    let sink = marginal
        .sink_entry(col)
        .map(|(lower, gap)| SinkEntry {
            lower,
            gap,
            row: axis_len - 1,
        });
    let sum_lower = marginal.sum_lower(col);

    output.clear();
    for chunk in input.chunks_exact(axis_len) {
        output.push(extremal_expectation(
            &view, sum_lower, sink, chunk, direction, ordering, assigned,
        ));
    }
}

fn joint_expectation<T: Scalar>(
    model: &FactoredImdp<T>,
    v_prev: &[T],
    direction: Direction,
    ws: &mut Workspace<T>,
) -> T {
    let dims = model.state_dims();
    let last = dims.len() - 1;

    let col = model.marginal_column(last, &ws.action_idx, &ws.state_idx);
    contract_axis(
        &model.marginals()[last],
        col,
        dims[last],
        v_prev,
        direction,
        &mut ws.ordering,
        &mut ws.assigned,
        &mut ws.front,
    );

    for axis in (0..last).rev() {
        let col = model.marginal_column(axis, &ws.action_idx, &ws.state_idx);
        contract_axis(
            &model.marginals()[axis],
            col,
            dims[axis],
            &ws.front,
            direction,
            &mut ws.ordering,
            &mut ws.assigned,
            &mut ws.back,
        );
        std::mem::swap(&mut ws.front, &mut ws.back);
    }

    ws.front[0]
}

impl<T: Scalar> RobustBellman for FactoredImdp<T> {
    type Scalar = T;

    fn num_states(&self) -> usize {
        self.num_joint_states()
    }

    fn num_actions(&self, _state: usize) -> usize {
        self.num_joint_actions()
    }

    fn step(
        &self,
        v_prev: &[T],
        v_cur: &mut [T],
        chosen: &mut [usize],
        direction: Direction,
        reduction: StrategyMode,
        policy: Option<&[usize]>,
    ) -> ImdpResult<()> {
        check_step_shapes(self, v_prev, v_cur, chosen, policy)?;

        let state_dims = self.state_dims();
        let action_dims = self.action_dims();
        let num_actions = self.num_joint_actions();

        v_cur
            .par_iter_mut()
            .zip_eq(chosen.par_iter_mut())
            .enumerate()
            .for_each_init(
                || Workspace::new(state_dims.len(), action_dims.len()),
                |ws, (s, (value, action))| {
                    index::unflatten(s, state_dims, &mut ws.state_idx);

                    let actions = match policy {
                        Some(p) => p[s]..p[s] + 1,
                        None => 0..num_actions,
                    };
                    let mut best = None;
                    let mut best_action = 0;
                    for a in actions {
                        index::unflatten(a, action_dims, &mut ws.action_idx);
                        let e = joint_expectation(self, v_prev, direction, ws);
                        let better = match best {
                            None => true,
                            Some(b) => improves(e, b, reduction),
                        };
                        if better {
                            best = Some(e);
                            best_action = a;
                        }
                    }

                    // stateptr-style validation guarantees at least one
                    // action, so `best` is always populated.
                    *value = best.unwrap_or_else(T::zero);
                    *action = best_action;
                },
            );

        Ok(())
    }
}
