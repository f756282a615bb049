//! 1-D cubic smoothing-spline fitting
//!
//! [`SplineFitter`] fits a cubic spline through an ordered set of knots and
//! values. With smoothness 0 the result is the exact natural interpolating
//! spline (zero curvature at both ends). For smoothness s in (0,1) the fit
//! minimizes
//!
//! ```text
//!   p * sum_i (y_i - g(x_i))^2  +  (1 - p) * integral g''(t)^2 dt
//! ```
//!
//! with p = 1 - s, so the curve trades exact interpolation for reduced
//! curvature as s grows. The fitted [`Spline`] evaluates itself and its
//! derivatives at arbitrary points within the knot range; derivatives of
//! order 4 and higher are exactly zero.
//!
//! The surface engine uses this fitter to synthesize the partial-derivative
//! fields at grid knots, one row or column at a time.

use log::trace;

use crate::{Result, SurfitError};

/// Fits cubic interpolating or smoothing splines through 1-D samples.
pub struct SplineFitter;

impl SplineFitter {
    /// Fit a cubic spline through `(knots[i], values[i])`.
    ///
    /// `knots` must be strictly increasing with at least 4 entries, `values`
    /// must have the same length, and `smoothness` must lie in [0,1). With
    /// smoothness 0 the spline passes exactly through every sample.
    pub fn fit(knots: &[f64], values: &[f64], smoothness: f64) -> Result<Spline> {
        let n = knots.len();
        if n < 4 {
            return Err(SurfitError::Construction(format!(
                "spline fit needs at least 4 knots, got {}",
                n
            )));
        }
        if values.len() != n {
            return Err(SurfitError::Construction(format!(
                "spline fit got {} knots but {} values",
                n,
                values.len()
            )));
        }
        // Written so a NaN knot also fails the comparison.
        if knots.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SurfitError::Construction(
                "spline knots must be strictly increasing".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&smoothness) {
            return Err(SurfitError::Construction(format!(
                "smoothness {} is outside [0,1)",
                smoothness
            )));
        }
        trace!("fitting spline through {} knots, smoothness {}", n, smoothness);

        let p = 1.0 - smoothness;
        let m = n - 2; // interior knots carry the unknown curvatures

        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let hrec: Vec<f64> = h.iter().map(|&hi| 1.0 / hi).collect();
        let divdif: Vec<f64> = (0..n - 1)
            .map(|i| (values[i + 1] - values[i]) * hrec[i])
            .collect();

        // Symmetric pentadiagonal system A u = rhs with
        //   A = 6(1-p) Q^T Q + p R,
        // where row k of Q^T holds (1/h_k, -(1/h_k + 1/h_{k+1}), 1/h_{k+1})
        // at columns k..k+2 and R is the natural-spline tridiagonal. At p=1
        // this is exactly the interpolating-spline system.
        let q = 6.0 * (1.0 - p);
        let mut d0 = vec![0.0; m]; // diagonal
        let mut d1 = vec![0.0; m.saturating_sub(1)]; // first subdiagonal
        let mut d2 = vec![0.0; m.saturating_sub(2)]; // second subdiagonal
        let mut rhs = vec![0.0; m];
        for k in 0..m {
            let (ra, rb) = (hrec[k], hrec[k + 1]);
            d0[k] = q * (ra * ra + (ra + rb) * (ra + rb) + rb * rb) + p * 2.0 * (h[k] + h[k + 1]);
            if k + 1 < m {
                let rc = hrec[k + 2];
                d1[k] = q * (-rb * (ra + 2.0 * rb + rc)) + p * h[k + 1];
            }
            if k + 2 < m {
                d2[k] = q * (rb * hrec[k + 2]);
            }
            rhs[k] = divdif[k + 1] - divdif[k];
        }
        let u = solve_banded_spd(&mut d0, &mut d1, &mut d2, rhs);

        // Curvatures at the knots (natural ends stay zero) and the smoothed
        // knot values y - 6(1-p) Q u.
        let mut ue = vec![0.0; n];
        ue[1..(m + 1)].copy_from_slice(&u[..m]);

        let mut fitted = values.to_vec();
        if smoothness > 0.0 {
            let v: Vec<f64> = (0..n - 1).map(|i| (ue[i + 1] - ue[i]) * hrec[i]).collect();
            for (j, value) in fitted.iter_mut().enumerate() {
                let left = if j > 0 { v[j - 1] } else { 0.0 };
                let right = if j < n - 1 { v[j] } else { 0.0 };
                *value -= q * (right - left);
            }
        }
        let curvature: Vec<f64> = ue.iter().map(|&uk| 6.0 * p * uk).collect();

        Ok(Spline {
            knots: knots.to_vec(),
            values: fitted,
            curvature,
        })
    }
}

/// A fitted cubic spline, represented by its knot coordinates, fitted knot
/// values, and second derivatives (curvatures) at the knots.
#[derive(Debug, Clone)]
pub struct Spline {
    knots: Vec<f64>,
    values: Vec<f64>,
    curvature: Vec<f64>,
}

impl Spline {
    /// Number of knots.
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    /// Always false; a fitted spline has at least 4 knots.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Fitted value at knot index `i`. Equals the input sample when fitted
    /// with smoothness 0.
    pub fn knot_value(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Evaluate the spline at `x`, which must lie within the knot range.
    pub fn evaluate(&self, x: f64) -> Result<f64> {
        self.evaluate_derivative(x, 0)
    }

    /// Evaluate the `order`-th derivative at `x`. Order 0 is the value
    /// itself; orders 4 and higher are exactly zero (the pieces are cubic).
    pub fn evaluate_derivative(&self, x: f64, order: usize) -> Result<f64> {
        let i = self.locate(x)?;
        if order >= 4 {
            return Ok(0.0);
        }
        let h = self.knots[i + 1] - self.knots[i];
        let t = x - self.knots[i];
        let (m0, m1) = (self.curvature[i], self.curvature[i + 1]);
        // Power-basis coefficients on [knots[i], knots[i+1]].
        let a3 = (m1 - m0) / (6.0 * h);
        let a2 = 0.5 * m0;
        let a1 = (self.values[i + 1] - self.values[i]) / h - h * (2.0 * m0 + m1) / 6.0;
        let a0 = self.values[i];
        let result = match order {
            0 => ((a3 * t + a2) * t + a1) * t + a0,
            1 => (3.0 * a3 * t + 2.0 * a2) * t + a1,
            2 => 6.0 * a3 * t + 2.0 * a2,
            3 => 6.0 * a3,
            _ => unreachable!(),
        };
        Ok(result)
    }

    /// Interval index for `x`: the largest `i` with `knots[i] <= x`, with
    /// the maximum knot mapping to the last interval.
    fn locate(&self, x: f64) -> Result<usize> {
        let n = self.knots.len();
        if !(x >= self.knots[0] && x <= self.knots[n - 1]) {
            return Err(SurfitError::OutOfRange(x));
        }
        let i = self.knots.partition_point(|&k| k <= x);
        Ok((i - 1).min(n - 2))
    }
}

/// Solves a symmetric positive-definite banded system of bandwidth 2 by
/// in-place LDL^T factorization. `d0` is the diagonal, `d1` and `d2` the
/// first and second subdiagonals.
fn solve_banded_spd(d0: &mut [f64], d1: &mut [f64], d2: &mut [f64], mut b: Vec<f64>) -> Vec<f64> {
    let n = d0.len();
    // Factor: d0 becomes D, d1/d2 become the unit-lower-triangular factors.
    for i in 0..n {
        if i >= 1 {
            let l1 = d1[i - 1];
            d0[i] -= l1 * l1 * d0[i - 1];
        }
        if i >= 2 {
            let l2 = d2[i - 2];
            d0[i] -= l2 * l2 * d0[i - 2];
        }
        if i + 1 < n {
            let mut a = d1[i];
            if i >= 1 {
                a -= d2[i - 1] * d1[i - 1] * d0[i - 1];
            }
            d1[i] = a / d0[i];
        }
        if i + 2 < n {
            d2[i] /= d0[i];
        }
    }
    // Forward substitution L z = b.
    for i in 0..n {
        if i >= 1 {
            b[i] -= d1[i - 1] * b[i - 1];
        }
        if i >= 2 {
            b[i] -= d2[i - 2] * b[i - 2];
        }
    }
    // Diagonal and backward substitution L^T x = z.
    for i in 0..n {
        b[i] /= d0[i];
    }
    for i in (0..n).rev() {
        if i + 1 < n {
            b[i] -= d1[i] * b[i + 1];
        }
        if i + 2 < n {
            b[i] -= d2[i] * b[i + 2];
        }
    }
    b
}
