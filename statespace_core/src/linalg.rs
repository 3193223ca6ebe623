// statespace_core/src/linalg.rs

//! Small dense helpers on top of `nalgebra`.
//!
//! Every covariance in the engine is produced by one of the `sym_*` functions
//! below. They compute the upper triangle once and mirror it, so the result
//! is exactly symmetric no matter how the dense products round.

use nalgebra::{Cholesky, DMatrix};

/// A vector of `ntimes` copies of `v`.
pub fn repeat(v: f64, ntimes: usize) -> Vec<f64> {
    vec![v; ntimes]
}

pub fn identity(n: usize) -> DMatrix<f64> {
    DMatrix::identity(n, n)
}

/// Reads a caller buffer (`dim0 x dim1`, row-major) into the internal
/// `dim1 x dim0` matrix, i.e. its transpose.
///
/// A row-major `dim0 x dim1` buffer is the column-major layout of its
/// `dim1 x dim0` transpose, so no element is moved.
pub fn from_caller(values: &[f64], dim0: usize, dim1: usize) -> DMatrix<f64> {
    DMatrix::from_column_slice(dim1, dim0, values)
}

/// Inverse of [`from_caller`]: the caller's row-major buffer.
pub fn to_caller(m: &DMatrix<f64>) -> Vec<f64> {
    m.as_slice().to_vec()
}

/// Exact symmetry test, no tolerance.
pub fn is_symmetric(m: &DMatrix<f64>) -> bool {
    if !m.is_square() {
        return false;
    }
    let n = m.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| m[(i, j)] == m[(j, i)]))
}

fn mirror_upper(m: &mut DMatrix<f64>) {
    let n = m.nrows();
    for j in 0..n {
        for i in (j + 1)..n {
            m[(i, j)] = m[(j, i)];
        }
    }
}

/// Symmetric cross product `xᵗ·a·x`.
///
/// `x` is `m x p`, `a` is `m x m`; the result is `p x p`.
pub fn sym_cross(x: &DMatrix<f64>, a: &DMatrix<f64>) -> DMatrix<f64> {
    debug_assert_eq!(a.nrows(), x.nrows());
    debug_assert_eq!(a.ncols(), x.nrows());

    let ax = a * x;
    let p = x.ncols();
    let mut out = DMatrix::zeros(p, p);
    for j in 0..p {
        let ax_j = ax.column(j);
        for i in 0..=j {
            out[(i, j)] = x.column(i).dot(&ax_j);
        }
    }
    mirror_upper(&mut out);
    out
}

/// Symmetric sandwich `x·a·xᵗ`.
pub fn sym_sandwich(x: &DMatrix<f64>, a: &DMatrix<f64>) -> DMatrix<f64> {
    sym_cross(&x.transpose(), a)
}

/// `a + b` for two symmetric matrices of the same size.
pub fn sym_add(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = a + b;
    mirror_upper(&mut out);
    out
}

/// `a - b` for two symmetric matrices of the same size.
pub fn sym_sub(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = a - b;
    mirror_upper(&mut out);
    out
}

/// Factors `s` and returns `(s⁻¹, ln|s|)`, or `None` when `s` is not
/// positive definite.
pub fn cholesky_inverse(s: &DMatrix<f64>) -> Option<(DMatrix<f64>, f64)> {
    let chol = Cholesky::new(s.clone())?;

    let l = chol.l_dirty();
    let mut log_det = 0.0;
    for i in 0..s.nrows() {
        let d = l[(i, i)];
        if !(d > 0.0 && d.is_finite()) {
            return None;
        }
        log_det += 2.0 * d.ln();
    }

    let mut inv = chol.inverse();
    inv.fill_upper_triangle_with_lower_triangle();
    Some((inv, log_det))
}

/// Lower Cholesky factor used to draw correlated noise. An all-zero matrix
/// gives a zero factor (noiseless term).
pub fn noise_factor(cov: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if cov.iter().all(|v| *v == 0.0) {
        return Some(DMatrix::zeros(cov.nrows(), cov.ncols()));
    }
    Cholesky::new(cov.clone()).map(|c| c.l())
}
