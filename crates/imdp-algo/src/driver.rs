//! Robust value iteration driver.
//!
//! The driver composes the Bellman operator with the property adapter
//! and a strategy cache in a plain sequential loop:
//!
//! ```text
//! initialize V from the property
//! loop:
//!     V.prev <- V.cur
//!     Bellman step (parallel)       -> V.cur, chosen actions
//!     property masking              -> V.cur
//!     strategy recording
//!     residual <- sup |V.cur - V.prev|
//!     callback, termination check
//! finalize strategy
//! ```
//!
//! Infinite-horizon solves that hit the iteration cap return the current
//! value function with `converged = false` instead of failing; shape
//! and ambiguity errors are fatal; a failing callback aborts with
//! [`ImdpError::CallbackAborted`].

use tracing::debug;

use imdp_core::{
    sup_norm, ImdpError, ImdpResult, Specification, Strategy, ValueFunctionPair,
};

use crate::bellman::RobustBellman;
use crate::properties::PropertyAdapter;
use crate::strategy_cache::StrategyCache;

/// A model paired with the specification to certify on it.
#[derive(Debug, Clone)]
pub struct Problem<B: RobustBellman> {
    model: B,
    specification: Specification<B::Scalar>,
}

impl<B: RobustBellman> Problem<B> {
    pub fn new(model: B, specification: Specification<B::Scalar>) -> Self {
        Self {
            model,
            specification,
        }
    }

    pub fn model(&self) -> &B {
        &self.model
    }

    pub fn specification(&self) -> &Specification<B::Scalar> {
        &self.specification
    }
}

/// Result of one solve.
#[derive(Debug, Clone)]
pub struct Solution<T> {
    /// Final value function over the flat joint state space.
    pub value_function: Vec<T>,
    /// Number of Bellman iterations performed.
    pub iterations: usize,
    /// Supremum norm of the last residual.
    pub residual: T,
    /// False when an infinite-horizon solve hit the iteration cap.
    pub converged: bool,
    /// Synthesized strategy, when one was requested.
    pub strategy: Option<Strategy>,
}

impl<T: imdp_core::Scalar> Solution<T> {
    /// Promote a non-converged solve into an error.
    pub fn ensure_converged(self) -> ImdpResult<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(ImdpError::NotConverged {
                max_iterations: self.iterations,
                residual: self.residual.to_string(),
            })
        }
    }
}

/// Per-iteration observer: receives the masked value function and the
/// iteration count; an error stops the solve.
pub type IterationCallback<'a, T> = &'a mut dyn FnMut(&[T], usize) -> anyhow::Result<()>;

/// Robust value iteration configuration.
#[derive(Debug, Clone)]
pub struct RobustValueIteration {
    /// Iteration cap for infinite-horizon properties.
    pub max_iterations: usize,
}

impl Default for RobustValueIteration {
    fn default() -> Self {
        Self::new()
    }
}

impl RobustValueIteration {
    pub fn new() -> Self {
        Self {
            max_iterations: 100_000,
        }
    }

    /// Override the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Certify the specification without keeping a strategy.
    pub fn verify<B: RobustBellman>(&self, problem: &Problem<B>) -> ImdpResult<Solution<B::Scalar>> {
        self.solve_with(problem, StrategyCache::None, None)
    }

    /// Certify and synthesize a controller: stationary for
    /// infinite-horizon properties, time-varying for finite horizons.
    pub fn synthesize<B: RobustBellman>(
        &self,
        problem: &Problem<B>,
    ) -> ImdpResult<Solution<B::Scalar>> {
        let cache = if problem.specification().property.is_infinite_horizon() {
            StrategyCache::stationary()
        } else {
            StrategyCache::time_varying()
        };
        self.solve_with(problem, cache, None)
    }

    /// Evaluate a fixed strategy instead of optimizing over actions.
    pub fn evaluate<B: RobustBellman>(
        &self,
        problem: &Problem<B>,
        strategy: Strategy,
    ) -> ImdpResult<Solution<B::Scalar>> {
        self.solve_with(problem, StrategyCache::Given(strategy), None)
    }

    /// Full-control entry point: explicit strategy cache and optional
    /// per-iteration callback.
    pub fn solve_with<B: RobustBellman>(
        &self,
        problem: &Problem<B>,
        mut cache: StrategyCache<B::Scalar>,
        mut callback: Option<IterationCallback<'_, B::Scalar>>,
    ) -> ImdpResult<Solution<B::Scalar>> {
        let model = problem.model();
        let spec = problem.specification();
        let num_states = model.num_states();

        let adapter = PropertyAdapter::new(&spec.property, num_states)?;
        validate_given_strategy(model, &cache, &adapter)?;

        let direction = spec.satisfaction_mode.direction();
        let reduction = spec.strategy_mode;

        let mut vf = ValueFunctionPair::new(num_states);
        adapter.initialize(vf.current_mut());
        cache.initialize(vf.current());

        let mut chosen = vec![0usize; num_states];
        let mut iterations = 0;
        let mut residual;
        let converged;

        loop {
            vf.copy_current_to_previous();
            let policy = cache.policy_for_iteration(iterations + 1);
            {
                let (prev, cur) = vf.step_buffers();
                model.step(prev, cur, &mut chosen, direction, reduction, policy)?;
            }
            adapter.apply_step(vf.current_mut());
            cache.record(&chosen, vf.current(), reduction);
            iterations += 1;
            residual = sup_norm(vf.last_diff());
            debug!(iteration = iterations, residual = %residual, "robust value iteration step");

            if let Some(cb) = callback.as_mut() {
                cb(vf.current(), iterations)
                    .map_err(|err| ImdpError::CallbackAborted(err.to_string()))?;
            }

            if adapter.should_terminate(iterations, residual) {
                converged = true;
                break;
            }
            if iterations >= self.max_iterations {
                converged = false;
                break;
            }
        }

        debug!(iterations, converged, "robust value iteration finished");

        Ok(Solution {
            value_function: vf.into_current(),
            iterations,
            residual,
            converged,
            strategy: cache.finalize(),
        })
    }
}

/// A prescribed strategy must match the model's shape and, for
/// time-varying strategies, the property's horizon.
fn validate_given_strategy<B: RobustBellman>(
    model: &B,
    cache: &StrategyCache<B::Scalar>,
    adapter: &PropertyAdapter<B::Scalar>,
) -> ImdpResult<()> {
    let Some(strategy) = cache.given() else {
        return Ok(());
    };
    let num_states = model.num_states();

    let check_step = |actions: &[usize]| -> ImdpResult<()> {
        if actions.len() != num_states {
            return Err(ImdpError::ShapeMismatch(format!(
                "strategy covers {} states but the model has {num_states}",
                actions.len()
            )));
        }
        for (s, &a) in actions.iter().enumerate() {
            if a >= model.num_actions(s) {
                return Err(ImdpError::ShapeMismatch(format!(
                    "strategy picks action {a} in state {s}, which has {}",
                    model.num_actions(s)
                )));
            }
        }
        Ok(())
    };

    match strategy {
        Strategy::Stationary(s) => check_step(&s.actions),
        Strategy::TimeVarying(tv) => {
            match adapter.horizon() {
                Some(horizon) if horizon == tv.horizon() => {}
                Some(horizon) => {
                    return Err(ImdpError::ShapeMismatch(format!(
                        "time-varying strategy spans {} steps but the horizon is {horizon}",
                        tv.horizon()
                    )))
                }
                None => {
                    return Err(ImdpError::ShapeMismatch(
                        "time-varying strategies require a finite-horizon property".into(),
                    ))
                }
            }
            for step in &tv.steps {
                check_step(step)?;
            }
            Ok(())
        }
    }
}
