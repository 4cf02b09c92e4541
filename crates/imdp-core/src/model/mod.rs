//! Interval Markov models.
//!
//! [`IntervalMdp`] covers the single-variable family: interval Markov
//! chains (one column per state) and interval MDPs (a `stateptr` table
//! mapping each source state to its range of action columns).
//! [`FactoredImdp`] covers the factored family, where the joint state
//! space is a product of variables and each variable's next-state
//! distribution has its own interval marginal conditioned on a set of
//! parent variables.

pub mod factored;
pub mod imdp;

pub use factored::{FactoredImdp, Marginal};
pub use imdp::IntervalMdp;
