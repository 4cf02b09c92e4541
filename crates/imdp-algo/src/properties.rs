//! Property adapters: initialization, per-step masking, termination.
//!
//! Each property kind supplies the three hooks the driver composes with
//! the Bellman operator. Masks are precomputed bitmaps over the flat
//! joint state space (row-major for factored models). Initialization
//! already applies the masks, so the first Bellman step sees the
//! property's indicator structure, and reapplying a mask is idempotent.

use imdp_core::{ImdpError, ImdpResult, Property, Scalar};

/// A property bound to a concrete state space.
#[derive(Debug, Clone)]
pub struct PropertyAdapter<T> {
    property: Property<T>,
    reach: Vec<bool>,
    avoid: Vec<bool>,
    terminal: Vec<bool>,
}

fn bitmap(set: &[usize], num_states: usize, what: &str) -> ImdpResult<Vec<bool>> {
    let mut mask = vec![false; num_states];
    for &s in set {
        if s >= num_states {
            return Err(ImdpError::ShapeMismatch(format!(
                "{what} state {s} outside the {num_states}-state space"
            )));
        }
        mask[s] = true;
    }
    Ok(mask)
}

impl<T: Scalar> PropertyAdapter<T> {
    /// Bind `property` to a `num_states`-state model, validating every
    /// referenced state index and vector length.
    pub fn new(property: &Property<T>, num_states: usize) -> ImdpResult<Self> {
        if let Some(horizon) = property.horizon() {
            if horizon == 0 {
                return Err(ImdpError::ShapeMismatch(
                    "finite-horizon properties need a horizon of at least one step".into(),
                ));
            }
        }

        let mut reach = vec![false; num_states];
        let mut avoid = vec![false; num_states];
        let mut terminal = vec![false; num_states];

        match property {
            Property::FiniteTimeReachability { reach: set, .. }
            | Property::InfiniteTimeReachability { reach: set, .. }
            | Property::ExactTimeReachability { reach: set, .. } => {
                reach = bitmap(set, num_states, "reach")?;
            }
            Property::FiniteTimeReachAvoid {
                reach: r, avoid: a, ..
            }
            | Property::InfiniteTimeReachAvoid {
                reach: r, avoid: a, ..
            } => {
                reach = bitmap(r, num_states, "reach")?;
                avoid = bitmap(a, num_states, "avoid")?;
            }
            Property::FiniteTimeSafety { avoid: a, .. }
            | Property::InfiniteTimeSafety { avoid: a, .. } => {
                avoid = bitmap(a, num_states, "avoid")?;
            }
            Property::FiniteTimeReward { reward, .. }
            | Property::InfiniteTimeReward { reward, .. } => {
                if reward.len() != num_states {
                    return Err(ImdpError::ShapeMismatch(format!(
                        "reward vector covers {} states but the model has {num_states}",
                        reward.len()
                    )));
                }
            }
            Property::ExpectedExitTime { terminal: t, .. } => {
                terminal = bitmap(t, num_states, "terminal")?;
            }
        }

        Ok(Self {
            property: property.clone(),
            reach,
            avoid,
            terminal,
        })
    }

    /// The bound property.
    pub fn property(&self) -> &Property<T> {
        &self.property
    }

    /// Horizon of a finite-time property.
    pub fn horizon(&self) -> Option<usize> {
        self.property.horizon()
    }

    /// Set up `v` before the first iteration.
    pub fn initialize(&self, v: &mut [T]) {
        match &self.property {
            Property::FiniteTimeReachability { .. }
            | Property::InfiniteTimeReachability { .. }
            | Property::FiniteTimeReachAvoid { .. }
            | Property::InfiniteTimeReachAvoid { .. } => {
                v.fill(T::zero());
                self.apply_step(v);
            }
            Property::ExactTimeReachability { .. } => {
                // Reach states are not absorbing here; the indicator is
                // set once and never masked again.
                for (value, &in_reach) in v.iter_mut().zip(self.reach.iter()) {
                    *value = if in_reach { T::one() } else { T::zero() };
                }
            }
            Property::FiniteTimeSafety { .. } | Property::InfiniteTimeSafety { .. } => {
                v.fill(T::one());
                self.apply_step(v);
            }
            Property::FiniteTimeReward { reward, .. }
            | Property::InfiniteTimeReward { reward, .. } => {
                v.copy_from_slice(reward);
            }
            Property::ExpectedExitTime { .. } => v.fill(T::zero()),
        }
    }

    /// Masking and accumulation applied after each Bellman step.
    pub fn apply_step(&self, v: &mut [T]) {
        match &self.property {
            Property::FiniteTimeReachability { .. }
            | Property::InfiniteTimeReachability { .. } => {
                for (value, &in_reach) in v.iter_mut().zip(self.reach.iter()) {
                    if in_reach {
                        *value = T::one();
                    }
                }
            }
            Property::ExactTimeReachability { .. } => {}
            Property::FiniteTimeReachAvoid { .. } | Property::InfiniteTimeReachAvoid { .. } => {
                // Avoid wins over reach when a state is in both.
                for (s, value) in v.iter_mut().enumerate() {
                    if self.avoid[s] {
                        *value = T::zero();
                    } else if self.reach[s] {
                        *value = T::one();
                    }
                }
            }
            Property::FiniteTimeSafety { .. } | Property::InfiniteTimeSafety { .. } => {
                for (value, &in_avoid) in v.iter_mut().zip(self.avoid.iter()) {
                    if in_avoid {
                        *value = T::zero();
                    }
                }
            }
            Property::FiniteTimeReward { reward, discount, .. }
            | Property::InfiniteTimeReward {
                reward, discount, ..
            } => {
                for (value, &r) in v.iter_mut().zip(reward.iter()) {
                    *value = r + *discount * *value;
                }
            }
            Property::ExpectedExitTime { .. } => {
                for (value, &is_terminal) in v.iter_mut().zip(self.terminal.iter()) {
                    if is_terminal {
                        *value = T::zero();
                    } else {
                        *value = *value + T::one();
                    }
                }
            }
        }
    }

    /// Whether iteration `k` (1-based) with the given residual norm may
    /// stop.
    pub fn should_terminate(&self, k: usize, residual: T) -> bool {
        match &self.property {
            Property::FiniteTimeReachability { horizon, .. }
            | Property::ExactTimeReachability { horizon, .. }
            | Property::FiniteTimeReachAvoid { horizon, .. }
            | Property::FiniteTimeSafety { horizon, .. }
            | Property::FiniteTimeReward { horizon, .. } => k >= *horizon,
            Property::InfiniteTimeReachability { epsilon, .. }
            | Property::InfiniteTimeReachAvoid { epsilon, .. }
            | Property::InfiniteTimeSafety { epsilon, .. }
            | Property::InfiniteTimeReward { epsilon, .. }
            | Property::ExpectedExitTime { epsilon, .. } => residual <= *epsilon,
        }
    }
}
