//! surfit: smooth bicubic surface interpolation
//!
//! Given samples of a two-argument function F(X,Y) on a rectangular grid
//! (regular or irregular spacing), this crate builds a piecewise-bicubic
//! surface that is continuous through its second derivatives and supports
//! fast repeated evaluation of the value and arbitrary-order partial
//! derivatives. Repeated access to nearby points is the dominant usage
//! pattern (a numerical integrator stepping through time), so every
//! evaluation call carries a caller-owned [`PatchHint`] that caches the most
//! recently resolved grid patch.
//!
//! The partial derivative fields `fx`, `fy` and `fxy` needed at each grid
//! knot are synthesized by fitting 1-D cubic splines through the sample rows
//! and columns ([`SplineFitter`]); at smoothness 0 the fits pass exactly
//! through every sample, for smoothness in (0,1) the surface relaxes into a
//! smoothing fit of noisy data.
//!
//! The surface itself is an immutable, reference-counted engine shared
//! through shallow [`BicubicSurface`] handles; many callers may evaluate
//! concurrently as long as each holds its own hint.

pub mod foundation;
pub mod function;
pub mod grid;
pub mod spline;
pub mod surface;

// Re-exports for convenience
pub use function::{BicubicFunction, Function};
pub use grid::{Axis, GridData};
pub use spline::{Spline, SplineFitter};
pub use surface::{BicubicSurface, PatchHint};

/// Result type for surfit operations
pub type Result<T> = std::result::Result<T, SurfitError>;

#[derive(Debug, thiserror::Error)]
pub enum SurfitError {
    /// Invalid inputs at construction time: axis too short, non-monotonic or
    /// duplicate coordinates, non-positive regular spacing, mismatched matrix
    /// shapes, or smoothness outside [0,1).
    #[error("invalid construction: {0}")]
    Construction(String),

    /// A query point outside the sampled rectangle; the surface never
    /// extrapolates.
    #[error("point ({0}, {1}) is outside the sampled domain")]
    OutOfDomain(f64, f64),

    /// A 1-D coordinate outside the fitted knot range.
    #[error("coordinate {0} is outside the fitted knot range")]
    OutOfRange(f64),

    /// A derivative component selector other than 0 (x) or 1 (y), an
    /// argument slice of the wrong length, or evaluation through an empty
    /// surface handle.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
