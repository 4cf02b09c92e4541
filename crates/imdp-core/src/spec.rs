//! Specifications: property kinds, satisfaction and strategy modes.
//!
//! A [`Specification`] pairs a [`Property`] with the side of the
//! ambiguity set to optimize over ([`SatisfactionMode`]) and the sense
//! of the action reduction ([`StrategyMode`]). The JSON representation
//! is the tagged form used by the internal file format, e.g.
//! `{"kind": "finite_time_reachability", "reach": [2], "horizon": 10}`.

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Which side of the ambiguity set the adversary takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SatisfactionMode {
    /// Worst case: lower bound on the computed value.
    Pessimistic,
    /// Best case: upper bound on the computed value.
    Optimistic,
}

impl SatisfactionMode {
    /// The extremum the inner optimization solves for.
    pub fn direction(self) -> Direction {
        match self {
            SatisfactionMode::Pessimistic => Direction::Lower,
            SatisfactionMode::Optimistic => Direction::Upper,
        }
    }
}

/// Sense of the reduction over actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyMode {
    Maximize,
    Minimize,
}

/// Extremum taken over one ambiguity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Infimum of the expected value over feasible distributions.
    Lower,
    /// Supremum of the expected value over feasible distributions.
    Upper,
}

/// Temporal property to certify.
///
/// State sets are flat joint-state indices. For factored models they
/// refer to the row-major flattening of the Cartesian index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: serde::de::DeserializeOwned"
))]
pub enum Property<T> {
    /// Probability of reaching `reach` within `horizon` steps.
    FiniteTimeReachability { reach: Vec<usize>, horizon: usize },
    /// Probability of eventually reaching `reach`, iterated to residual
    /// `epsilon`.
    InfiniteTimeReachability { reach: Vec<usize>, epsilon: T },
    /// Probability of being in `reach` after exactly `horizon` steps
    /// (reach states are not absorbing).
    ExactTimeReachability { reach: Vec<usize>, horizon: usize },
    /// Probability of reaching `reach` within `horizon` steps while
    /// avoiding `avoid`.
    FiniteTimeReachAvoid {
        reach: Vec<usize>,
        avoid: Vec<usize>,
        horizon: usize,
    },
    /// Probability of eventually reaching `reach` while avoiding
    /// `avoid`.
    InfiniteTimeReachAvoid {
        reach: Vec<usize>,
        avoid: Vec<usize>,
        epsilon: T,
    },
    /// Probability of staying outside `avoid` for `horizon` steps.
    FiniteTimeSafety { avoid: Vec<usize>, horizon: usize },
    /// Probability of never entering `avoid`.
    InfiniteTimeSafety { avoid: Vec<usize>, epsilon: T },
    /// Discounted accumulated reward over `horizon` steps, starting
    /// from `reward` itself.
    FiniteTimeReward {
        reward: Vec<T>,
        discount: T,
        horizon: usize,
    },
    /// Discounted accumulated reward iterated to residual `epsilon`.
    InfiniteTimeReward {
        reward: Vec<T>,
        discount: T,
        epsilon: T,
    },
    /// Expected number of steps until `terminal` is entered.
    ExpectedExitTime { terminal: Vec<usize>, epsilon: T },
}

impl<T: Scalar> Property<T> {
    /// Horizon of a finite-time property.
    pub fn horizon(&self) -> Option<usize> {
        match self {
            Property::FiniteTimeReachability { horizon, .. }
            | Property::ExactTimeReachability { horizon, .. }
            | Property::FiniteTimeReachAvoid { horizon, .. }
            | Property::FiniteTimeSafety { horizon, .. }
            | Property::FiniteTimeReward { horizon, .. } => Some(*horizon),
            _ => None,
        }
    }

    /// True for properties iterated to a residual threshold.
    pub fn is_infinite_horizon(&self) -> bool {
        self.horizon().is_none()
    }
}

/// A property together with the optimization modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: serde::de::DeserializeOwned"
))]
pub struct Specification<T> {
    pub property: Property<T>,
    pub satisfaction_mode: SatisfactionMode,
    pub strategy_mode: StrategyMode,
}

impl<T: Scalar> Specification<T> {
    pub fn new(
        property: Property<T>,
        satisfaction_mode: SatisfactionMode,
        strategy_mode: StrategyMode,
    ) -> Self {
        Self {
            property,
            satisfaction_mode,
            strategy_mode,
        }
    }
}
