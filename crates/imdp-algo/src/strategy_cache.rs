//! Strategy caches: what the driver does with chosen actions.
//!
//! Verification discards them, evaluation prescribes them, synthesis
//! accumulates them. Stationary synthesis keeps the action that first
//! achieved the best value seen so far (strict improvement against the
//! running per-state value), time-varying synthesis snapshots every
//! step and reverses the sequence at the end into execution order.

use imdp_core::{Scalar, StationaryStrategy, Strategy, StrategyMode, TimeVaryingStrategy};

use crate::bellman::improves;

/// Per-solve action recording policy.
#[derive(Debug, Clone)]
pub enum StrategyCache<T> {
    /// Verification only: chosen actions are discarded.
    None,
    /// Evaluate a fixed strategy: the Bellman step is restricted to the
    /// prescribed action per state, no reduction.
    Given(Strategy),
    /// Synthesize one action per state for infinite horizons.
    Stationary(StationaryCache<T>),
    /// Synthesize one action array per step for finite horizons.
    TimeVarying(TimeVaryingCache),
}

/// Running best values and the actions that achieved them.
#[derive(Debug, Clone, Default)]
pub struct StationaryCache<T> {
    values: Vec<T>,
    actions: Vec<Option<usize>>,
}

/// Snapshots of the chosen-action array, one per iteration.
#[derive(Debug, Clone, Default)]
pub struct TimeVaryingCache {
    steps: Vec<Vec<usize>>,
}

impl<T: Scalar> StrategyCache<T> {
    /// Fresh stationary-synthesis cache.
    pub fn stationary() -> Self {
        StrategyCache::Stationary(StationaryCache {
            values: Vec::new(),
            actions: Vec::new(),
        })
    }

    /// Fresh time-varying-synthesis cache.
    pub fn time_varying() -> Self {
        StrategyCache::TimeVarying(TimeVaryingCache { steps: Vec::new() })
    }

    /// Reset against the initialized value function. The stationary
    /// baseline starts at `V_0`, so an action is only recorded once it
    /// strictly beats the initialization.
    pub fn initialize(&mut self, v0: &[T]) {
        match self {
            StrategyCache::None | StrategyCache::Given(_) => {}
            StrategyCache::Stationary(cache) => {
                cache.values = v0.to_vec();
                cache.actions = vec![None; v0.len()];
            }
            StrategyCache::TimeVarying(cache) => cache.steps.clear(),
        }
    }

    /// Action restriction for iteration `k` (1-based), if this cache
    /// prescribes one.
    pub fn policy_for_iteration(&self, k: usize) -> Option<&[usize]> {
        match self {
            StrategyCache::Given(Strategy::Stationary(s)) => Some(&s.actions),
            // Iteration k computes the value with k steps remaining, so
            // it applies the decision made k steps from the horizon.
            StrategyCache::Given(Strategy::TimeVarying(tv)) => tv.for_remaining(k),
            _ => None,
        }
    }

    /// Record the step's chosen actions and post-step values.
    pub fn record(&mut self, chosen: &[usize], values: &[T], reduction: StrategyMode) {
        match self {
            StrategyCache::None | StrategyCache::Given(_) => {}
            StrategyCache::Stationary(cache) => {
                for (s, (&action, &value)) in chosen.iter().zip(values.iter()).enumerate() {
                    if improves(value, cache.values[s], reduction) {
                        cache.values[s] = value;
                        cache.actions[s] = Some(action);
                    }
                }
            }
            StrategyCache::TimeVarying(cache) => cache.steps.push(chosen.to_vec()),
        }
    }

    /// Extract the synthesized strategy, if any. States a stationary
    /// synthesis never improved fall back to action 0; the recorded
    /// time-varying sequence is reversed into execution order.
    pub fn finalize(self) -> Option<Strategy> {
        match self {
            StrategyCache::None | StrategyCache::Given(_) => None,
            StrategyCache::Stationary(cache) => Some(Strategy::Stationary(
                StationaryStrategy::new(
                    cache
                        .actions
                        .into_iter()
                        .map(|action| action.unwrap_or(0))
                        .collect(),
                ),
            )),
            StrategyCache::TimeVarying(cache) => {
                let mut steps = cache.steps;
                steps.reverse();
                Some(Strategy::TimeVarying(TimeVaryingStrategy::new(steps)))
            }
        }
    }

    /// The prescribed strategy, when evaluating one.
    pub fn given(&self) -> Option<&Strategy> {
        match self {
            StrategyCache::Given(strategy) => Some(strategy),
            _ => None,
        }
    }
}
