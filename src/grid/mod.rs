//! Sample grid: axis definitions and knot data
//!
//! An [`Axis`] is an ordered set of strictly increasing sample coordinates,
//! stored either explicitly or generated algebraically from an origin and a
//! positive spacing. [`GridData`] owns the two axes, the sampled value
//! matrix `f` and the three partial-derivative matrices `fx`, `fy`, `fxy`;
//! everything is immutable once construction succeeds. When the derivatives
//! are not supplied directly they are synthesized from 1-D spline fits
//! through the sample rows and columns.

use log::debug;
use nalgebra::DMatrix;

use crate::spline::SplineFitter;
use crate::{Result, SurfitError};

/// Minimum number of samples per axis; four knots are needed for a cubic
/// fit in each direction.
pub const MIN_AXIS_LEN: usize = 4;

/// An ordered, strictly increasing sequence of sample coordinates.
///
/// Two variants: `Explicit` stores arbitrary spacings, `Regular` generates
/// coordinates from an origin and a positive spacing. Patch location is
/// O(log n) for explicit axes (binary search) and O(1) for regular ones.
#[derive(Debug, Clone)]
pub enum Axis {
    /// Arbitrary, strictly increasing coordinates.
    Explicit(Vec<f64>),
    /// Coordinates `origin + i * spacing` for `i` in `0..count`.
    Regular {
        origin: f64,
        spacing: f64,
        count: usize,
    },
}

impl Axis {
    /// Build an explicit axis, validating length and strict monotonicity.
    pub fn from_coords(coords: Vec<f64>) -> Result<Self> {
        if coords.len() < MIN_AXIS_LEN {
            return Err(SurfitError::Construction(format!(
                "axis needs at least {} coordinates, got {}",
                MIN_AXIS_LEN,
                coords.len()
            )));
        }
        // Written so a NaN coordinate also fails the comparison.
        if coords.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SurfitError::Construction(
                "axis coordinates must be strictly increasing with no duplicates".to_string(),
            ));
        }
        Ok(Axis::Explicit(coords))
    }

    /// Build a regular axis, validating length and positive spacing.
    pub fn regular(origin: f64, spacing: f64, count: usize) -> Result<Self> {
        if count < MIN_AXIS_LEN {
            return Err(SurfitError::Construction(format!(
                "axis needs at least {} coordinates, got {}",
                MIN_AXIS_LEN, count
            )));
        }
        if !(spacing > 0.0) || !spacing.is_finite() {
            return Err(SurfitError::Construction(format!(
                "regular axis spacing must be positive and finite, got {}",
                spacing
            )));
        }
        if !origin.is_finite() {
            return Err(SurfitError::Construction(format!(
                "regular axis origin must be finite, got {}",
                origin
            )));
        }
        Ok(Axis::Regular {
            origin,
            spacing,
            count,
        })
    }

    /// Number of sample coordinates.
    pub fn len(&self) -> usize {
        match self {
            Axis::Explicit(coords) => coords.len(),
            Axis::Regular { count, .. } => *count,
        }
    }

    /// Always false; a constructed axis has at least [`MIN_AXIS_LEN`]
    /// coordinates.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate of sample `i`.
    pub fn coord(&self, i: usize) -> f64 {
        match self {
            Axis::Explicit(coords) => coords[i],
            Axis::Regular {
                origin, spacing, ..
            } => origin + spacing * i as f64,
        }
    }

    /// Smallest sample coordinate.
    pub fn min_coord(&self) -> f64 {
        self.coord(0)
    }

    /// Largest sample coordinate.
    pub fn max_coord(&self) -> f64 {
        self.coord(self.len() - 1)
    }

    /// True when `x` lies within the sampled range, boundaries inclusive.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min_coord() && x <= self.max_coord()
    }

    /// Index of the interval containing `x`: the largest `i` with
    /// `coord(i) <= x`, except that the maximum coordinate maps to the last
    /// interval. Points outside the range are an error; the surface never
    /// extrapolates.
    pub fn locate(&self, x: f64) -> Result<usize> {
        if !self.contains(x) {
            return Err(SurfitError::OutOfRange(x));
        }
        let last = self.len() - 2;
        let i = match self {
            Axis::Explicit(coords) => coords.partition_point(|&c| c <= x) - 1,
            Axis::Regular {
                origin, spacing, ..
            } => ((x - origin) / spacing).floor().max(0.0) as usize,
        };
        Ok(i.min(last))
    }

    /// Search the intervals immediately adjacent to `center` (inclusive)
    /// for one containing `x`. Returns `None` when `x` is farther away, in
    /// which case the caller falls back to the general [`Axis::locate`].
    pub fn locate_near(&self, center: usize, x: f64) -> Option<usize> {
        let last = self.len() - 2;
        let lo = center.saturating_sub(1);
        let hi = (center + 1).min(last);
        (lo..=hi).find(|&i| self.coord(i) <= x && x <= self.coord(i + 1))
    }
}

/// The immutable knot data behind a bicubic surface: two axes, the sampled
/// values and the three partial-derivative fields, all of shape (nx, ny)
/// with `f[(i, j)] = F(x_i, y_j)`.
#[derive(Debug, Clone)]
pub struct GridData {
    x: Axis,
    y: Axis,
    f: DMatrix<f64>,
    fx: DMatrix<f64>,
    fy: DMatrix<f64>,
    fxy: DMatrix<f64>,
}

impl GridData {
    /// Build grid data, synthesizing `fx`, `fy` and `fxy` from spline fits.
    ///
    /// For each of the ny columns a spline is fitted through the nx points
    /// `(x_i, f(i,j))` and differentiated at the knots to give `fx`;
    /// symmetrically row fits give `fy`. The cross derivative `fxy` is then
    /// produced by applying the x-direction fit to the `fy` field, column
    /// by column (y first, then x — the fixed convention of this crate).
    ///
    /// With smoothness 0 the fits interpolate the samples exactly. For
    /// smoothness in (0,1) the sample matrix is first relaxed by
    /// smoothing-spline passes along the columns and then the rows, and the
    /// derivative fields are synthesized from the relaxed knots, so the
    /// surface no longer passes exactly through the original samples.
    pub fn synthesized(x: Axis, y: Axis, f: DMatrix<f64>, smoothness: f64) -> Result<Self> {
        Self::validate_shape(&x, &y, &f, "f")?;
        if !(0.0..1.0).contains(&smoothness) {
            return Err(SurfitError::Construction(format!(
                "smoothness {} is outside [0,1)",
                smoothness
            )));
        }
        let (nx, ny) = (x.len(), y.len());
        debug!(
            "synthesizing partial derivatives for {}x{} grid, smoothness {}",
            nx, ny, smoothness
        );

        let xs: Vec<f64> = (0..nx).map(|i| x.coord(i)).collect();
        let ys: Vec<f64> = (0..ny).map(|j| y.coord(j)).collect();

        let f = if smoothness > 0.0 {
            let relaxed = smooth_columns(&xs, &f, smoothness)?;
            smooth_rows(&ys, &relaxed, smoothness)?
        } else {
            f
        };

        let fx = differentiate_columns(&xs, &f, 0.0)?;
        let fy = differentiate_rows(&ys, &f, 0.0)?;
        let fxy = differentiate_columns(&xs, &fy, 0.0)?;

        Ok(GridData {
            x,
            y,
            f,
            fx,
            fy,
            fxy,
        })
    }

    /// Build grid data from explicitly supplied derivative fields, skipping
    /// synthesis. All four matrices must share the grid's shape.
    pub fn with_derivatives(
        x: Axis,
        y: Axis,
        f: DMatrix<f64>,
        fx: DMatrix<f64>,
        fy: DMatrix<f64>,
        fxy: DMatrix<f64>,
    ) -> Result<Self> {
        Self::validate_shape(&x, &y, &f, "f")?;
        Self::validate_shape(&x, &y, &fx, "fx")?;
        Self::validate_shape(&x, &y, &fy, "fy")?;
        Self::validate_shape(&x, &y, &fxy, "fxy")?;
        Ok(GridData {
            x,
            y,
            f,
            fx,
            fy,
            fxy,
        })
    }

    fn validate_shape(x: &Axis, y: &Axis, m: &DMatrix<f64>, name: &str) -> Result<()> {
        if m.nrows() != x.len() || m.ncols() != y.len() {
            return Err(SurfitError::Construction(format!(
                "matrix {} has shape {}x{} but the axes define {}x{}",
                name,
                m.nrows(),
                m.ncols(),
                x.len(),
                y.len()
            )));
        }
        Ok(())
    }

    /// The x axis.
    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    /// The y axis.
    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    /// Knot values, shape (nx, ny): the samples themselves, or their
    /// relaxed counterparts when built with smoothness > 0.
    pub fn f(&self) -> &DMatrix<f64> {
        &self.f
    }

    /// Partial derivative of f with respect to x at each knot.
    pub fn fx(&self) -> &DMatrix<f64> {
        &self.fx
    }

    /// Partial derivative of f with respect to y at each knot.
    pub fn fy(&self) -> &DMatrix<f64> {
        &self.fy
    }

    /// Mixed partial derivative of f at each knot.
    pub fn fxy(&self) -> &DMatrix<f64> {
        &self.fxy
    }
}

/// Fit a spline down each column of `m` (varying the row index against the
/// `coords` of that direction) and return the first derivative at every
/// knot.
fn differentiate_columns(
    coords: &[f64],
    m: &DMatrix<f64>,
    smoothness: f64,
) -> Result<DMatrix<f64>> {
    let (nr, nc) = (m.nrows(), m.ncols());
    let mut out = DMatrix::zeros(nr, nc);
    let mut samples = vec![0.0; nr];
    for j in 0..nc {
        for i in 0..nr {
            samples[i] = m[(i, j)];
        }
        let spline = SplineFitter::fit(coords, &samples, smoothness)?;
        for i in 0..nr {
            out[(i, j)] = spline.evaluate_derivative(coords[i], 1)?;
        }
    }
    Ok(out)
}

/// Row-wise counterpart of [`differentiate_columns`].
fn differentiate_rows(coords: &[f64], m: &DMatrix<f64>, smoothness: f64) -> Result<DMatrix<f64>> {
    let (nr, nc) = (m.nrows(), m.ncols());
    let mut out = DMatrix::zeros(nr, nc);
    let mut samples = vec![0.0; nc];
    for i in 0..nr {
        for j in 0..nc {
            samples[j] = m[(i, j)];
        }
        let spline = SplineFitter::fit(coords, &samples, smoothness)?;
        for j in 0..nc {
            out[(i, j)] = spline.evaluate_derivative(coords[j], 1)?;
        }
    }
    Ok(out)
}

/// Replace each column of `m` with the knot values of a smoothing-spline
/// fit through it.
fn smooth_columns(coords: &[f64], m: &DMatrix<f64>, smoothness: f64) -> Result<DMatrix<f64>> {
    let (nr, nc) = (m.nrows(), m.ncols());
    let mut out = DMatrix::zeros(nr, nc);
    let mut samples = vec![0.0; nr];
    for j in 0..nc {
        for i in 0..nr {
            samples[i] = m[(i, j)];
        }
        let spline = SplineFitter::fit(coords, &samples, smoothness)?;
        for i in 0..nr {
            out[(i, j)] = spline.knot_value(i);
        }
    }
    Ok(out)
}

/// Row-wise counterpart of [`smooth_columns`].
fn smooth_rows(coords: &[f64], m: &DMatrix<f64>, smoothness: f64) -> Result<DMatrix<f64>> {
    let (nr, nc) = (m.nrows(), m.ncols());
    let mut out = DMatrix::zeros(nr, nc);
    let mut samples = vec![0.0; nc];
    for i in 0..nr {
        for j in 0..nc {
            samples[j] = m[(i, j)];
        }
        let spline = SplineFitter::fit(coords, &samples, smoothness)?;
        for j in 0..nc {
            out[(i, j)] = spline.knot_value(j);
        }
    }
    Ok(out)
}
