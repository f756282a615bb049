//! Generic scalar-function abstraction
//!
//! [`Function`] is the consumer-facing contract for a scalar function of
//! several arguments with arbitrary-order partial derivatives.
//! [`BicubicFunction`] satisfies it for two arguments by wrapping a shared
//! [`BicubicSurface`] together with exactly one private [`PatchHint`], so
//! that each distinct use of a surface gets its own locality optimization.
//!
//! `BicubicFunction` itself is not thread-safe (its hint is mutable state),
//! but the surface behind it is: give each thread its own
//! `BicubicFunction` over a clone of the same handle.

use crate::surface::{BicubicSurface, PatchHint};
use crate::{Result, SurfitError};

/// A scalar function of `argument_count()` real arguments supporting
/// partial derivatives of any order.
pub trait Function {
    /// Number of arguments the function takes.
    fn argument_count(&self) -> usize;

    /// Highest derivative order that may be requested. Unbounded here,
    /// although a bicubic surface's derivatives of total order 4 or more
    /// along one axis are identically zero.
    fn max_derivative_order(&self) -> usize;

    /// Value at `args`, which must have exactly `argument_count()` entries.
    fn value(&mut self, args: &[f64]) -> Result<f64>;

    /// Partial derivative at `args`, specified by listing argument indices
    /// to differentiate against in order.
    fn derivative(&mut self, components: &[usize], args: &[f64]) -> Result<f64>;
}

/// A two-argument [`Function`] backed by a shared [`BicubicSurface`].
///
/// The surface handle is shared, not copied; the hint is private to this
/// instance.
#[derive(Debug, Clone)]
pub struct BicubicFunction {
    surface: BicubicSurface,
    hint: PatchHint,
}

impl BicubicFunction {
    /// Wrap the given surface handle. Cloning the handle is shallow, so
    /// many functions can reference one engine cheaply.
    pub fn new(surface: BicubicSurface) -> Self {
        BicubicFunction {
            surface,
            hint: PatchHint::new(),
        }
    }

    /// The surface this function evaluates.
    pub fn surface(&self) -> &BicubicSurface {
        &self.surface
    }
}

fn as_point(args: &[f64], what: &str) -> Result<[f64; 2]> {
    match args {
        &[x, y] => Ok([x, y]),
        _ => Err(SurfitError::InvalidArgument(format!(
            "{} takes exactly 2 arguments, got {}",
            what,
            args.len()
        ))),
    }
}

impl Function for BicubicFunction {
    fn argument_count(&self) -> usize {
        2
    }

    fn max_derivative_order(&self) -> usize {
        usize::MAX
    }

    fn value(&mut self, args: &[f64]) -> Result<f64> {
        let xy = as_point(args, "BicubicFunction::value")?;
        self.surface.value(xy, &mut self.hint)
    }

    fn derivative(&mut self, components: &[usize], args: &[f64]) -> Result<f64> {
        let xy = as_point(args, "BicubicFunction::derivative")?;
        self.surface.derivative(components, xy, &mut self.hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    const TEST_TOL: f64 = 1e-9;

    fn product_surface() -> BicubicSurface {
        let f = DMatrix::from_fn(4, 4, |i, j| (i * j) as f64);
        BicubicSurface::regular([0.0, 0.0], [1.0, 1.0], &f, 0.0).unwrap()
    }

    #[test]
    fn test_function_contract() {
        let mut func = BicubicFunction::new(product_surface());
        assert_eq!(func.argument_count(), 2);
        assert_eq!(func.max_derivative_order(), usize::MAX);
        let z = func.value(&[1.5, 2.0]).unwrap();
        assert!((z - 3.0).abs() < TEST_TOL);
        let dz = func.derivative(&[0], &[1.5, 2.0]).unwrap();
        assert!((dz - 2.0).abs() < TEST_TOL);
    }

    #[test]
    fn test_wrong_argument_count_is_rejected() {
        let mut func = BicubicFunction::new(product_surface());
        assert!(matches!(
            func.value(&[1.0]),
            Err(SurfitError::InvalidArgument(_))
        ));
        assert!(matches!(
            func.derivative(&[0], &[1.0, 2.0, 3.0]),
            Err(SurfitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_each_function_owns_a_private_hint() {
        let surface = product_surface();
        let mut f1 = BicubicFunction::new(surface.clone());
        let mut f2 = BicubicFunction::new(surface.clone());

        // Interleaved access from two functions: each keeps its own
        // locality, both tally on the shared surface statistics.
        let _ = f1.value(&[0.5, 0.5]).unwrap();
        let _ = f2.value(&[2.5, 2.5]).unwrap();
        let _ = f1.value(&[0.5, 0.5]).unwrap();
        let _ = f2.value(&[2.5, 2.5]).unwrap();
        assert_eq!(surface.num_accesses(), 4);
        assert_eq!(surface.num_accesses_same_point(), 2);
    }

    #[test]
    fn test_function_usable_as_trait_object() {
        let mut funcs: Vec<Box<dyn Function>> = vec![
            Box::new(BicubicFunction::new(product_surface())),
            Box::new(BicubicFunction::new(product_surface())),
        ];
        for func in funcs.iter_mut() {
            assert_eq!(func.argument_count(), 2);
            let z = func.value(&[1.0, 1.0]).unwrap();
            assert!((z - 1.0).abs() < TEST_TOL);
        }
    }
}
