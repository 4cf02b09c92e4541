//! Value-function buffer pair.

use num_traits::Signed;

use crate::scalar::{max, Scalar};

/// Previous/current value-function buffers.
///
/// The driver owns one pair per solve. A Bellman step reads `previous`
/// and writes every entry of `current`; `last_diff` turns the previous
/// buffer into the residual in place, which is safe because the next
/// iteration starts by copying current over previous again.
#[derive(Debug, Clone)]
pub struct ValueFunctionPair<T> {
    prev: Vec<T>,
    cur: Vec<T>,
}

impl<T: Scalar> ValueFunctionPair<T> {
    /// Zero-initialized pair over `num_states` entries.
    pub fn new(num_states: usize) -> Self {
        Self {
            prev: vec![T::zero(); num_states],
            cur: vec![T::zero(); num_states],
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.cur.len()
    }

    /// True when the pair covers no states.
    pub fn is_empty(&self) -> bool {
        self.cur.is_empty()
    }

    /// The current value function.
    pub fn current(&self) -> &[T] {
        &self.cur
    }

    /// Mutable access to the current value function.
    pub fn current_mut(&mut self) -> &mut [T] {
        &mut self.cur
    }

    /// The previous value function.
    pub fn previous(&self) -> &[T] {
        &self.prev
    }

    /// Split borrow for one Bellman step: the previous buffer read-only,
    /// the current buffer writable.
    pub fn step_buffers(&mut self) -> (&[T], &mut [T]) {
        (&self.prev, &mut self.cur)
    }

    /// Copy the current buffer into the previous one (iteration
    /// boundary).
    pub fn copy_current_to_previous(&mut self) {
        self.prev.copy_from_slice(&self.cur);
    }

    /// Compute `current - previous` in place into the previous buffer
    /// and return it. The previous buffer holds the residual afterwards.
    pub fn last_diff(&mut self) -> &[T] {
        for (p, &c) in self.prev.iter_mut().zip(self.cur.iter()) {
            *p = c - *p;
        }
        &self.prev
    }

    /// Consume the pair, keeping the current buffer.
    pub fn into_current(self) -> Vec<T> {
        self.cur
    }
}

/// Supremum norm of a residual slice.
pub fn sup_norm<T: Scalar>(values: &[T]) -> T {
    values
        .iter()
        .fold(T::zero(), |acc, &v| max(acc, v.abs()))
}
