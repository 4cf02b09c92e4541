//! Scalar abstraction over floating-point and exact rational arithmetic.
//!
//! Every matrix, model, and solver in the workspace is generic over
//! [`Scalar`]. Floats trade exactness for speed; [`Rational64`] carries
//! exact arithmetic through the entire iteration, which the tests use to
//! pin down closed-form results without tolerances.

use std::fmt::{Debug, Display};

use num_traits::{Num, Signed};

pub use num_rational::Rational64;

/// Numeric requirements of the robust value iteration kernels.
///
/// `Num` supplies ring arithmetic plus zero/one, `Signed` supplies `abs`
/// for residual norms, and `PartialOrd` drives the greedy ordering. The
/// `Send + Sync + 'static` bounds let value vectors cross rayon worker
/// boundaries. Implemented for anything satisfying the bounds; the
/// instantiations used in practice are `f32`, `f64`, and [`Rational64`].
pub trait Scalar:
    Num + Signed + PartialOrd + Copy + Send + Sync + Debug + Display + 'static
{
}

impl<T> Scalar for T where
    T: Num + Signed + PartialOrd + Copy + Send + Sync + Debug + Display + 'static
{
}

/// Smaller of two partially ordered scalars.
///
/// Scalars are not `Ord` (floats), so `std::cmp::min` does not apply.
/// Comparisons against NaN fall back to the first argument; validated
/// ambiguity sets never contain NaN.
#[inline]
pub fn min<T: Scalar>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

/// Larger of two partially ordered scalars.
#[inline]
pub fn max<T: Scalar>(a: T, b: T) -> T {
    if b > a {
        b
    } else {
        a
    }
}
