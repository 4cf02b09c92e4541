//! # imdp-algo: Robust Value Iteration
//!
//! Algorithms for certifying and synthesizing control strategies over
//! interval Markov decision processes: the greedy assignment kernel, the
//! robust Bellman operator (single-variable and factored), strategy
//! caches, property adapters, and the iteration driver.
//!
//! ## Architecture
//!
//! One iteration flows through the components in a fixed order:
//!
//! ```text
//! (V_k, model, spec)
//!     -> ordering    sorts each column's targets by V_k
//!     -> omax        assigns the extremal feasible distribution
//!     -> bellman     reduces over actions per source state
//!     -> properties  applies the property's per-step masking
//!     -> driver      records strategies, checks termination, swaps buffers
//! ```
//!
//! The driver is a plain sequential loop; all parallelism lives inside a
//! single Bellman step, where source states are independent and
//! partitioned across rayon workers with private scratch buffers. The
//! result is a deterministic function of the inputs regardless of worker
//! count: sorts tie-break on target position, action reductions update
//! on strict improvement only, and per-column summation order is fixed
//! by the sort permutation.
//!
//! ## Entry points
//!
//! [`RobustValueIteration`] is the driver. [`Problem`] pairs a model
//! with a [`Specification`](imdp_core::Specification); models plug in
//! through the [`RobustBellman`] trait, implemented here for
//! [`IntervalMdp`](imdp_core::IntervalMdp) over dense or sparse storage
//! and for [`FactoredImdp`](imdp_core::FactoredImdp).

pub mod bellman;
pub mod driver;
pub mod factored;
pub mod omax;
pub mod ordering;
pub mod properties;
pub mod strategy_cache;

pub use bellman::RobustBellman;
pub use driver::{Problem, RobustValueIteration, Solution};
pub use omax::{extremal_expectation, SinkEntry};
pub use ordering::SortWorkspace;
pub use properties::PropertyAdapter;
pub use strategy_cache::StrategyCache;
