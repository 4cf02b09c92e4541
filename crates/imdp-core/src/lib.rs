//! # imdp-core: Interval Markov Model Core
//!
//! Data structures for robust verification and control synthesis over
//! interval Markov decision processes (IMDPs) and their factored
//! generalizations.
//!
//! ## Design Philosophy
//!
//! Transition probabilities are specified as intervals `[lower, upper]`
//! per (source-action, target) pair. The set of distributions compatible
//! with one column of intervals is its **ambiguity set**; all algorithms
//! in `imdp-algo` bound expectations over these sets. This crate owns:
//!
//! - **Interval matrices**: dense and sparse (CSC) column-major storage
//!   with precomputed gaps and lower-bound column sums ([`matrix`])
//! - **Models**: [`IntervalMdp`] over one joint state space and
//!   [`FactoredImdp`] over a product of state variables ([`model`])
//! - **Value functions and strategies**: the previous/current buffer pair
//!   and stationary/time-varying controllers ([`value`], [`strategy`])
//! - **Specifications**: property kinds, satisfaction and strategy modes
//!   ([`spec`])
//!
//! Columns index source-action pairs and rows index target states.
//! Column-major layout is load-bearing: the inner solver loops walk all
//! targets of one source-action pair, and both storage variants expose
//! that walk through the same [`ColumnView`] so the optimization kernel
//! has a single code path.
//!
//! ## Scalars
//!
//! Every structure is generic over [`Scalar`], instantiated at `f32`,
//! `f64`, or [`Rational64`] for exact arithmetic. No global state: thread
//! count, precision, and storage choice all flow through the problem
//! object built on top of these types.

pub mod error;
pub mod index;
pub mod matrix;
pub mod model;
pub mod scalar;
pub mod spec;
pub mod strategy;
pub mod value;

pub use error::{AmbiguityError, ImdpError, ImdpResult};
pub use matrix::{ColumnRows, ColumnView, DenseIntervalMatrix, IntervalMatrix, SparseIntervalMatrix};
pub use model::{FactoredImdp, IntervalMdp, Marginal};
pub use scalar::{Rational64, Scalar};
pub use spec::{Direction, Property, SatisfactionMode, Specification, StrategyMode};
pub use strategy::{StationaryStrategy, Strategy, TimeVaryingStrategy};
pub use value::{sup_norm, ValueFunctionPair};
