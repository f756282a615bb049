//! Bicubic surface engine, shared handles, patch hints and statistics
//!
//! [`BicubicSurface`] is a lightweight, shallow-copyable handle onto a
//! shared, immutable surface engine. Construction fits the surface once;
//! afterwards any number of handles (and threads) may evaluate it, each
//! passing its own [`PatchHint`] so that spatially coherent access — the
//! common case for a numerical integrator — skips patch search and
//! coefficient assembly almost entirely.
//!
//! Every evaluation resolves through a tiered protocol:
//!
//! 1. **same point** — the hint memoizes the last query point and which
//!    derivative was computed there; an exact repeat returns the memoized
//!    result untouched.
//! 2. **same patch** — the point still falls within the cached patch
//!    (boundaries inclusive, so a sweep landing on a shared edge sticks to
//!    the cached patch); cached coefficients are reused.
//! 3. **nearby patch** — the immediate neighbors of the cached patch are
//!    probed before any general search.
//! 4. **general search** — per-axis patch location (binary search on
//!    explicit axes, O(1) arithmetic on regular axes).
//!
//! The engine tallies how often each tier resolved an access. The counters
//! are shared by every hint referencing the engine and are updated without
//! synchronization beyond relaxed atomics: concurrent increments may lose
//! counts, which is accepted — they are advisory diagnostics and never feed
//! back into evaluation decisions.

mod patch;

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use nalgebra::DMatrix;

use crate::foundation::{Handle, IdAllocator, UniqueId};
use crate::grid::{Axis, GridData};
use crate::{Result, SurfitError};

use patch::CornerData;

static SURFACE_IDS: IdAllocator = IdAllocator::new();

/// Advisory access counters, shared by all hints referencing one engine.
///
/// Updated with relaxed atomics only: lost increments under concurrent
/// access are acceptable, the numbers are diagnostics.
#[derive(Debug, Default)]
struct AccessStats {
    accesses: AtomicU64,
    same_point: AtomicU64,
    same_patch: AtomicU64,
    nearby_patch: AtomicU64,
}

impl AccessStats {
    fn reset(&self) {
        self.accesses.store(0, Ordering::Relaxed);
        self.same_point.store(0, Ordering::Relaxed);
        self.same_patch.store(0, Ordering::Relaxed);
        self.nearby_patch.store(0, Ordering::Relaxed);
    }
}

/// The exact-point memo inside a hint: the last query point, which
/// derivative was computed there (empty = the value itself), and the
/// result.
#[derive(Debug, Clone)]
struct PointMemo {
    xy: [f64; 2],
    components: Vec<usize>,
    result: f64,
}

/// The resolved-patch record inside a hint.
#[derive(Debug, Clone)]
struct HintData {
    i: usize,
    j: usize,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    coeffs: [[f64; 4]; 4],
    memo: Option<PointMemo>,
}

impl HintData {
    fn covers(&self, xy: [f64; 2]) -> bool {
        self.x0 <= xy[0] && xy[0] <= self.x1 && self.y0 <= xy[1] && xy[1] <= self.y1
    }

    /// Evaluate the cached polynomial (or the requested derivative of it)
    /// at `xy`.
    fn evaluate(&self, xy: [f64; 2], components: &[usize]) -> f64 {
        let dx = self.x1 - self.x0;
        let dy = self.y1 - self.y0;
        let u = (xy[0] - self.x0) / dx;
        let v = (xy[1] - self.y0) / dy;
        if components.is_empty() {
            patch::evaluate(&self.coeffs, u, v)
        } else {
            let dc = patch::derivative_coefficients(&self.coeffs, components, dx, dy);
            patch::evaluate(&dc, u, v)
        }
    }
}

/// A small, caller-owned cache of the most recently resolved patch.
///
/// Pass the same hint into consecutive evaluation calls to benefit from
/// spatial coherence. A hint belongs to exactly one calling context; it is
/// not safe to share one hint between concurrent callers. Hints may freely
/// outlive or be outlived by the surface they were used with.
#[derive(Debug, Clone, Default)]
pub struct PatchHint {
    data: Option<HintData>,
}

impl PatchHint {
    /// Creates an empty hint holding no patch information.
    pub fn new() -> Self {
        PatchHint::default()
    }

    /// True when the hint holds no patch information.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Erase any cached patch information.
    pub fn clear(&mut self) {
        self.data = None;
    }
}

/// The shared, immutable surface engine behind the handles.
struct SurfaceGuts {
    grid: GridData,
    stats: AccessStats,
    id: UniqueId,
}

impl SurfaceGuts {
    /// Tiered evaluation; `components` is empty for a value query.
    fn resolve(&self, xy: [f64; 2], components: &[usize], hint: &mut PatchHint) -> Result<f64> {
        for &c in components {
            if c > 1 {
                return Err(SurfitError::InvalidArgument(format!(
                    "derivative component {} must be 0 (x) or 1 (y)",
                    c
                )));
            }
        }
        let [qx, qy] = xy;
        if !(self.grid.x_axis().contains(qx) && self.grid.y_axis().contains(qy)) {
            return Err(SurfitError::OutOfDomain(qx, qy));
        }
        self.stats.accesses.fetch_add(1, Ordering::Relaxed);

        // Tier 1: exact repeat of the previous query.
        if let Some(data) = hint.data.as_ref() {
            if let Some(memo) = data.memo.as_ref() {
                if memo.xy == xy && memo.components == components {
                    self.stats.same_point.fetch_add(1, Ordering::Relaxed);
                    return Ok(memo.result);
                }
            }
        }

        // Tier 2: the point still lies on the cached patch (boundaries
        // inclusive, so shared edges stay with the cached patch).
        if let Some(data) = hint.data.as_mut() {
            if data.covers(xy) {
                let result = data.evaluate(xy, components);
                self.stats.same_patch.fetch_add(1, Ordering::Relaxed);
                data.memo = Some(PointMemo {
                    xy,
                    components: components.to_vec(),
                    result,
                });
                return Ok(result);
            }
        }

        // Tier 3: probe the cached patch's immediate neighbors on both
        // axes before any general search.
        let nearby = hint.data.as_ref().and_then(|data| {
            let i = self.grid.x_axis().locate_near(data.i, qx)?;
            let j = self.grid.y_axis().locate_near(data.j, qy)?;
            Some((i, j))
        });
        if nearby.is_some() {
            self.stats.nearby_patch.fetch_add(1, Ordering::Relaxed);
        }

        // Tier 4: general per-axis patch location.
        let (i, j) = match nearby {
            Some(ij) => ij,
            None => (self.grid.x_axis().locate(qx)?, self.grid.y_axis().locate(qy)?),
        };

        let mut data = self.assemble(i, j);
        let result = data.evaluate(xy, components);
        data.memo = Some(PointMemo {
            xy,
            components: components.to_vec(),
            result,
        });
        hint.data = Some(data);
        Ok(result)
    }

    /// Gather the four corner quadruples of cell (i, j) and assemble its
    /// polynomial coefficients.
    fn assemble(&self, i: usize, j: usize) -> HintData {
        let grid = &self.grid;
        let gather = |m: &DMatrix<f64>| [[m[(i, j)], m[(i, j + 1)]], [m[(i + 1, j)], m[(i + 1, j + 1)]]];
        let corners = CornerData {
            f: gather(grid.f()),
            fx: gather(grid.fx()),
            fy: gather(grid.fy()),
            fxy: gather(grid.fxy()),
        };
        let (x0, x1) = (grid.x_axis().coord(i), grid.x_axis().coord(i + 1));
        let (y0, y1) = (grid.y_axis().coord(j), grid.y_axis().coord(j + 1));
        HintData {
            i,
            j,
            x0,
            x1,
            y0,
            y1,
            coeffs: patch::assemble(&corners, x1 - x0, y1 - y0),
            memo: None,
        }
    }
}

/// A smooth bicubic interpolation of a two-argument function F(X,Y),
/// continuous through its second derivatives.
///
/// This type is a shallow handle: cloning shares the underlying engine and
/// its statistics, and the engine is freed when the last handle drops. A
/// default-constructed handle is empty and rejects evaluation; use one of
/// the constructors to fit a surface.
///
/// # Example
///
/// ```rust,ignore
/// use nalgebra::DMatrix;
/// use surfit::{BicubicSurface, PatchHint};
///
/// let f = DMatrix::from_fn(4, 4, |i, j| (i * j) as f64);
/// let surface = BicubicSurface::regular([0.0, 0.0], [1.0, 1.0], &f, 0.0)?;
///
/// let mut hint = PatchHint::new();
/// let z = surface.value([1.5, 2.5], &mut hint)?;
/// let dz_dx = surface.derivative(&[0], [1.5, 2.5], &mut hint)?;
/// ```
#[derive(Clone, Default)]
pub struct BicubicSurface {
    guts: Handle<SurfaceGuts>,
}

impl BicubicSurface {
    /// Fit a surface through samples `f[(i, j)] = F(x[i], y[j])` on
    /// explicitly spaced axes. Both axes need at least 4 strictly
    /// increasing coordinates and `f` must have shape
    /// `(x.len(), y.len())`.
    ///
    /// With `smoothness` 0 the surface passes exactly through every sample;
    /// as it tends toward 1 the surface smooths out noise and no longer
    /// interpolates. The partial-derivative fields are synthesized from
    /// 1-D spline fits through the rows and columns of `f`.
    pub fn new(x: &[f64], y: &[f64], f: &DMatrix<f64>, smoothness: f64) -> Result<Self> {
        let grid = GridData::synthesized(
            Axis::from_coords(x.to_vec())?,
            Axis::from_coords(y.to_vec())?,
            f.clone(),
            smoothness,
        )?;
        Ok(Self::from_grid(grid))
    }

    /// Fit a surface on a regularly spaced grid: sample (i, j) lies at
    /// `origin + (i * spacing[0], j * spacing[1])`. Both spacings must be
    /// positive and `f` at least 4x4.
    pub fn regular(
        origin: [f64; 2],
        spacing: [f64; 2],
        f: &DMatrix<f64>,
        smoothness: f64,
    ) -> Result<Self> {
        let grid = GridData::synthesized(
            Axis::regular(origin[0], spacing[0], f.nrows())?,
            Axis::regular(origin[1], spacing[1], f.ncols())?,
            f.clone(),
            smoothness,
        )?;
        Ok(Self::from_grid(grid))
    }

    /// Advanced constructor taking precomputed partial-derivative fields,
    /// bypassing spline synthesis. All four matrices must share `f`'s
    /// shape.
    pub fn with_derivatives(
        x: &[f64],
        y: &[f64],
        f: &DMatrix<f64>,
        fx: &DMatrix<f64>,
        fy: &DMatrix<f64>,
        fxy: &DMatrix<f64>,
    ) -> Result<Self> {
        let grid = GridData::with_derivatives(
            Axis::from_coords(x.to_vec())?,
            Axis::from_coords(y.to_vec())?,
            f.clone(),
            fx.clone(),
            fy.clone(),
            fxy.clone(),
        )?;
        Ok(Self::from_grid(grid))
    }

    /// Same as [`BicubicSurface::with_derivatives`], on a regular grid.
    pub fn regular_with_derivatives(
        origin: [f64; 2],
        spacing: [f64; 2],
        f: &DMatrix<f64>,
        fx: &DMatrix<f64>,
        fy: &DMatrix<f64>,
        fxy: &DMatrix<f64>,
    ) -> Result<Self> {
        let grid = GridData::with_derivatives(
            Axis::regular(origin[0], spacing[0], f.nrows())?,
            Axis::regular(origin[1], spacing[1], f.ncols())?,
            f.clone(),
            fx.clone(),
            fy.clone(),
            fxy.clone(),
        )?;
        Ok(Self::from_grid(grid))
    }

    fn from_grid(grid: GridData) -> Self {
        let id = SURFACE_IDS.allocate();
        debug!(
            "constructed bicubic surface {} over {}x{} grid",
            id,
            grid.x_axis().len(),
            grid.y_axis().len()
        );
        BicubicSurface {
            guts: Handle::new(SurfaceGuts {
                grid,
                stats: AccessStats::default(),
                id,
            }),
        }
    }

    /// Creates an empty handle referencing no surface. Evaluation through
    /// an empty handle is an invalid-argument error.
    pub fn empty() -> Self {
        BicubicSurface {
            guts: Handle::null(),
        }
    }

    /// True when this handle references no surface.
    pub fn is_empty(&self) -> bool {
        self.guts.is_null()
    }

    /// Return this handle to its default, non-referencing state. If it held
    /// the last reference, the engine is freed.
    pub fn clear(&mut self) {
        self.guts = Handle::null();
    }

    /// Number of handles currently sharing the engine (0 for an empty
    /// handle).
    pub fn reference_count(&self) -> usize {
        self.guts.strong_count()
    }

    /// The process-unique id of the underlying engine, or `None` for an
    /// empty handle.
    pub fn surface_id(&self) -> Option<UniqueId> {
        self.guts.get().map(|g| g.id)
    }

    fn guts(&self) -> Result<&SurfaceGuts> {
        self.guts.get().ok_or_else(|| {
            SurfitError::InvalidArgument("evaluation through an empty surface handle".to_string())
        })
    }

    /// Interpolated value F(X,Y) at `xy`. The hint makes repeated access to
    /// the same point or patch nearly free; each calling context must own
    /// its own hint.
    pub fn value(&self, xy: [f64; 2], hint: &mut PatchHint) -> Result<f64> {
        self.guts()?.resolve(xy, &[], hint)
    }

    /// Slow-but-convenient value lookup using a throwaway hint.
    pub fn value_at(&self, xy: [f64; 2]) -> Result<f64> {
        let mut hint = PatchHint::new();
        self.value(xy, &mut hint)
    }

    /// A partial derivative at `xy`, specified by listing the argument
    /// components to differentiate against in order: 0 = x, 1 = y. For
    /// example `[0]` is DF/Dx and `[0, 1]` the mixed second derivative
    /// D²F/DxDy. An empty list returns the value itself; any total order
    /// of 4 or more along one axis is exactly 0 because the pieces are
    /// cubic.
    pub fn derivative(
        &self,
        components: &[usize],
        xy: [f64; 2],
        hint: &mut PatchHint,
    ) -> Result<f64> {
        self.guts()?.resolve(xy, components, hint)
    }

    /// Slow-but-convenient derivative lookup using a throwaway hint.
    pub fn derivative_at(&self, components: &[usize], xy: [f64; 2]) -> Result<f64> {
        let mut hint = PatchHint::new();
        self.derivative(components, xy, &mut hint)
    }

    /// Non-failing domain precheck: true when `xy` lies within the sampled
    /// rectangle (false for an empty handle). Evaluating an out-of-domain
    /// point raises an error instead of extrapolating; call this first if
    /// unsure.
    pub fn is_defined(&self, xy: [f64; 2]) -> bool {
        self.guts
            .get()
            .map(|g| g.grid.x_axis().contains(xy[0]) && g.grid.y_axis().contains(xy[1]))
            .unwrap_or(false)
    }

    /// Total number of value/derivative accesses across all hints (0 for an
    /// empty handle). Advisory only; see the module notes on counter races.
    pub fn num_accesses(&self) -> u64 {
        self.load_stat(|s| &s.accesses)
    }

    /// Accesses resolved from the exact-point memo with no computation.
    pub fn num_accesses_same_point(&self) -> u64 {
        self.load_stat(|s| &s.same_point)
    }

    /// Accesses resolved on the cached patch without any patch search,
    /// including repeat points asked for different information.
    pub fn num_accesses_same_patch(&self) -> u64 {
        self.load_stat(|s| &s.same_patch)
    }

    /// Accesses resolved by probing the cached patch's neighbors instead of
    /// a general search.
    pub fn num_accesses_nearby_patch(&self) -> u64 {
        self.load_stat(|s| &s.nearby_patch)
    }

    /// Reset all statistics to zero. Any holder of a handle may reset; no
    /// attempt is made to coordinate simultaneous resets across threads.
    pub fn reset_statistics(&self) {
        if let Some(guts) = self.guts.get() {
            guts.stats.reset();
        }
    }

    fn load_stat(&self, pick: impl Fn(&AccessStats) -> &AtomicU64) -> u64 {
        self.guts
            .get()
            .map(|g| pick(&g.stats).load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for BicubicSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.guts.get() {
            Some(guts) => f
                .debug_struct("BicubicSurface")
                .field("id", &guts.id)
                .field("nx", &guts.grid.x_axis().len())
                .field("ny", &guts.grid.y_axis().len())
                .finish(),
            None => f.write_str("BicubicSurface(empty)"),
        }
    }
}
