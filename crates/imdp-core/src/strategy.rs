//! Synthesized and prescribed control strategies.
//!
//! Action indices are zero-based joint-action indices throughout; the
//! text file formats convert to their own conventions at the boundary.

use serde::{Deserialize, Serialize};

/// One action per state, independent of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationaryStrategy {
    pub actions: Vec<usize>,
}

impl StationaryStrategy {
    pub fn new(actions: Vec<usize>) -> Self {
        Self { actions }
    }

    pub fn num_states(&self) -> usize {
        self.actions.len()
    }
}

/// One action array per horizon step, in execution order: `steps[t]` is
/// the decision at time `t`, when `horizon - t` steps remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeVaryingStrategy {
    pub steps: Vec<Vec<usize>>,
}

impl TimeVaryingStrategy {
    pub fn new(steps: Vec<Vec<usize>>) -> Self {
        Self { steps }
    }

    pub fn horizon(&self) -> usize {
        self.steps.len()
    }

    /// The decision array used when `remaining` steps are left. Returns
    /// `None` when `remaining` is zero or beyond the horizon.
    pub fn for_remaining(&self, remaining: usize) -> Option<&[usize]> {
        if remaining == 0 || remaining > self.steps.len() {
            return None;
        }
        Some(&self.steps[self.steps.len() - remaining])
    }
}

/// Either strategy shape, as produced by synthesis or prescribed for
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Stationary(StationaryStrategy),
    TimeVarying(TimeVaryingStrategy),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_varying_lookup() {
        let strategy = TimeVaryingStrategy::new(vec![vec![0, 1], vec![1, 1], vec![0, 0]]);
        assert_eq!(strategy.horizon(), 3);
        // Three steps remaining: first entry in execution order.
        assert_eq!(strategy.for_remaining(3), Some(&[0, 1][..]));
        assert_eq!(strategy.for_remaining(1), Some(&[0, 0][..]));
        assert_eq!(strategy.for_remaining(0), None);
        assert_eq!(strategy.for_remaining(4), None);
    }

    #[test]
    fn test_strategy_serialization_tags() {
        let strategy = Strategy::Stationary(StationaryStrategy::new(vec![0, 2]));
        let json = serde_json::to_string(&strategy).unwrap();
        assert!(json.contains("\"kind\":\"stationary\""));
        let back: Strategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, strategy);
    }
}
