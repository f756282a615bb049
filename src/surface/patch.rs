//! Per-patch bicubic coefficient assembly and polynomial evaluation
//!
//! Each grid cell carries one bicubic polynomial
//!
//! ```text
//!   F(u, v) = sum over p,q in 0..4 of c[p][q] * u^p * v^q
//! ```
//!
//! in the normalized cell coordinates u, v in [0,1]. The 16 coefficients
//! come from the (f, fx, fy, fxy) quadruples at the four cell corners,
//! derivatives rescaled by the local cell width and height, transformed
//! through the fixed cubic-Hermite basis matrix.

/// Knot data at the four corners of one cell, indexed `[di][dj]` with
/// di, dj in {0,1} selecting the low/high corner along x and y.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CornerData {
    pub f: [[f64; 2]; 2],
    pub fx: [[f64; 2]; 2],
    pub fy: [[f64; 2]; 2],
    pub fxy: [[f64; 2]; 2],
}

/// Hermite-to-power basis: maps (value at 0, value at 1, slope at 0,
/// slope at 1) to the coefficients of the matching cubic in one variable.
const HERMITE: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [-3.0, 3.0, -2.0, -1.0],
    [2.0, -2.0, 1.0, 1.0],
];

/// Assemble the 16 polynomial coefficients for one cell of width `dx` and
/// height `dy`. The coefficient matrix is `H * Q * H^T` where `Q` packs the
/// corner data with derivatives scaled into cell coordinates.
pub(crate) fn assemble(corners: &CornerData, dx: f64, dy: f64) -> [[f64; 4]; 4] {
    let CornerData { f, fx, fy, fxy } = corners;
    let dxdy = dx * dy;
    // Rows: x-Hermite data (f at x0, f at x1, fx at x0, fx at x1).
    // Columns: the same along y.
    let q = [
        [f[0][0], f[0][1], dy * fy[0][0], dy * fy[0][1]],
        [f[1][0], f[1][1], dy * fy[1][0], dy * fy[1][1]],
        [
            dx * fx[0][0],
            dx * fx[0][1],
            dxdy * fxy[0][0],
            dxdy * fxy[0][1],
        ],
        [
            dx * fx[1][0],
            dx * fx[1][1],
            dxdy * fxy[1][0],
            dxdy * fxy[1][1],
        ],
    ];

    let mut c = [[0.0; 4]; 4];
    for p in 0..4 {
        for qi in 0..4 {
            let mut sum = 0.0;
            for a in 0..4 {
                for b in 0..4 {
                    sum += HERMITE[p][a] * q[a][b] * HERMITE[qi][b];
                }
            }
            c[p][qi] = sum;
        }
    }
    c
}

/// Evaluate the bicubic polynomial at normalized coordinates (u, v), by
/// Horner's rule in both variables.
pub(crate) fn evaluate(c: &[[f64; 4]; 4], u: f64, v: f64) -> f64 {
    let mut result = 0.0;
    for p in (0..4).rev() {
        let row = ((c[p][3] * v + c[p][2]) * v + c[p][1]) * v + c[p][0];
        result = result * u + row;
    }
    result
}

/// Differentiate the polynomial term by term, once per entry of
/// `components` (0 = x, 1 = y, already validated by the caller), applying
/// the chain-rule factor 1/dx or 1/dy for each differentiation. Any total
/// order of 4 or more along one axis leaves all coefficients zero, so the
/// evaluated derivative is exactly 0.
pub(crate) fn derivative_coefficients(
    c: &[[f64; 4]; 4],
    components: &[usize],
    dx: f64,
    dy: f64,
) -> [[f64; 4]; 4] {
    let mut c = *c;
    for &axis in components {
        debug_assert!(axis < 2);
        let mut next = [[0.0; 4]; 4];
        if axis == 0 {
            for p in 0..3 {
                for q in 0..4 {
                    next[p][q] = (p + 1) as f64 * c[p + 1][q] / dx;
                }
            }
        } else {
            for p in 0..4 {
                for q in 0..3 {
                    next[p][q] = (q + 1) as f64 * c[p][q + 1] / dy;
                }
            }
        }
        c = next;
    }
    c
}
