use faer::linalg::solvers::Solve;
use faer::{Mat, MatRef, Side};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{Result, SvarError};

pub(crate) fn mat_all_finite(mat: &MatRef<f64>) -> bool {
    let mut ok = true;
    faer::zip!(mat).for_each(|faer::unzip!(val)| ok &= val.is_finite());
    ok
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert!(a.len() == b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `vᵀ M v` for a square `M`.
pub(crate) fn quadratic_form(mat: MatRef<'_, f64>, v: &[f64]) -> f64 {
    let n = v.len();
    assert!(mat.nrows() == n && mat.ncols() == n);
    let mut out = 0f64;
    for i in 0..n {
        let mut row = 0f64;
        for j in 0..n {
            row += mat[(i, j)] * v[j];
        }
        out += v[i] * row;
    }
    out
}

/// Lower Cholesky factor, or `None` if the matrix is not positive definite.
pub(crate) fn cholesky_lower(mat: MatRef<'_, f64>) -> Option<Mat<f64>> {
    if !mat_all_finite(&mat) {
        return None;
    }
    let llt = mat.llt(Side::Lower).ok()?;
    let lower = llt.L().to_owned();
    let mut ok = true;
    for i in 0..lower.nrows() {
        ok &= lower[(i, i)] > 0f64 && lower[(i, i)].is_finite();
    }
    ok.then_some(lower)
}

/// Solve `L x = rhs` in place.
pub(crate) fn forward_substitute(lower: MatRef<'_, f64>, x: &mut [f64]) {
    let n = x.len();
    assert!(lower.nrows() == n);
    for i in 0..n {
        let mut acc = x[i];
        for j in 0..i {
            acc -= lower[(i, j)] * x[j];
        }
        x[i] = acc / lower[(i, i)];
    }
}

/// Solve `Lᵀ x = rhs` in place.
pub(crate) fn backward_substitute_transposed(lower: MatRef<'_, f64>, x: &mut [f64]) {
    let n = x.len();
    assert!(lower.nrows() == n);
    for i in (0..n).rev() {
        let mut acc = x[i];
        for j in (i + 1)..n {
            acc -= lower[(j, i)] * x[j];
        }
        x[i] = acc / lower[(i, i)];
    }
}

/// Solve `L Lᵀ x = rhs` given the lower Cholesky factor.
pub(crate) fn cholesky_solve(lower: MatRef<'_, f64>, rhs: &[f64]) -> Vec<f64> {
    let mut x = rhs.to_vec();
    forward_substitute(lower, &mut x);
    backward_substitute_transposed(lower, &mut x);
    x
}

/// Draw from `N(P⁻¹ location, P⁻¹)` for a precision matrix `P = L Lᵀ`.
///
/// Returns `None` if `precision` does not admit a Cholesky factorisation.
pub(crate) fn sample_from_precision<R: Rng + ?Sized>(
    precision: MatRef<'_, f64>,
    location: &[f64],
    rng: &mut R,
) -> Option<Vec<f64>> {
    let lower = cholesky_lower(precision)?;
    let mut x = location.to_vec();
    forward_substitute(lower.as_ref(), &mut x);
    x.iter_mut().for_each(|val| {
        let z: f64 = StandardNormal.sample(rng);
        *val += z;
    });
    backward_substitute_transposed(lower.as_ref(), &mut x);
    Some(x)
}

/// Unit vector orthogonal to every column of `mat` except column `skip`.
///
/// This is the last column of the full Q factor of the QR decomposition of
/// `mat` with column `skip` removed.
pub(crate) fn orthogonal_complement(mat: MatRef<'_, f64>, skip: usize) -> Vec<f64> {
    let n = mat.nrows();
    assert!(mat.ncols() == n && skip < n);
    if n == 1 {
        return vec![1f64];
    }
    let others = Mat::from_fn(n, n - 1, |i, j| {
        let col = if j < skip { j } else { j + 1 };
        mat[(i, col)]
    });
    let q = others.as_ref().qr().compute_Q();
    (0..n).map(|i| q[(i, n - 1)]).collect()
}

fn qr_diagonal(mat: MatRef<'_, f64>) -> Vec<f64> {
    let qr = mat.qr();
    let r = qr.R();
    (0..r.nrows().min(r.ncols()))
        .map(|i| r[(i, i)].abs())
        .collect()
}

/// Absolute value of the determinant of a square matrix.
///
/// Fails with a configuration error if `mat` is not square.
pub fn abs_determinant(mat: MatRef<'_, f64>) -> Result<f64> {
    if mat.nrows() != mat.ncols() {
        return Err(SvarError::config(format!(
            "the determinant needs a square matrix, got {}x{}",
            mat.nrows(),
            mat.ncols()
        )));
    }
    Ok(qr_diagonal(mat).iter().product())
}

/// `min |R_ii| / max |R_ii|` of the QR decomposition, a cheap lower bound
/// style measure of how far a square matrix is from singular.
pub(crate) fn qr_conditioning(mat: MatRef<'_, f64>) -> f64 {
    let diag = qr_diagonal(mat);
    let max = diag.iter().cloned().fold(0f64, f64::max);
    let min = diag.iter().cloned().fold(f64::INFINITY, f64::min);
    if max <= 0f64 || !max.is_finite() {
        return 0f64;
    }
    min / max
}

pub(crate) fn is_invertible(mat: MatRef<'_, f64>, tol: f64) -> bool {
    mat_all_finite(&mat) && qr_conditioning(mat) > tol
}

/// Distance of `v` from span(columns of `basis`), relative to `1 + |v|`.
///
/// Returns `None` if the columns of `basis` are linearly dependent.
pub(crate) fn span_residual(basis: MatRef<'_, f64>, v: &[f64]) -> Option<f64> {
    assert!(basis.nrows() == v.len());
    let gram = basis.transpose() * basis;
    let lower = cholesky_lower(gram.as_ref())?;
    let rhs: Vec<f64> = (0..basis.ncols())
        .map(|j| (0..v.len()).map(|i| basis[(i, j)] * v[i]).sum())
        .collect();
    let coef = cholesky_solve(lower.as_ref(), &rhs);
    let residual = (0..v.len())
        .map(|i| {
            let fitted: f64 = (0..basis.ncols()).map(|j| basis[(i, j)] * coef[j]).sum();
            (v[i] - fitted).powi(2)
        })
        .sum::<f64>()
        .sqrt();
    Some(residual / (1f64 + dot(v, v).sqrt()))
}

/// Orthogonal projection of `v` onto span(columns of `basis`).
pub(crate) fn project_onto_span(basis: MatRef<'_, f64>, v: &[f64]) -> Option<Vec<f64>> {
    let gram = basis.transpose() * basis;
    let lower = cholesky_lower(gram.as_ref())?;
    let rhs: Vec<f64> = (0..basis.ncols())
        .map(|j| (0..v.len()).map(|i| basis[(i, j)] * v[i]).sum())
        .collect();
    let coef = cholesky_solve(lower.as_ref(), &rhs);
    Some(
        (0..basis.nrows())
            .map(|i| (0..basis.ncols()).map(|j| basis[(i, j)] * coef[j]).sum())
            .collect(),
    )
}

/// Inverse of a square matrix via a partially pivoted LU decomposition.
pub(crate) fn inverse(mat: MatRef<'_, f64>) -> Mat<f64> {
    let n = mat.nrows();
    let lu = mat.partial_piv_lu();
    let identity = Mat::<f64>::identity(n, n);
    lu.solve(identity.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn spd(vals: &[f64], n: usize) -> Mat<f64> {
        let m = Mat::from_fn(n, n, |i, j| vals[i * n + j]);
        let mut out = m.transpose() * &m;
        for i in 0..n {
            out[(i, i)] += 1f64;
        }
        out
    }

    proptest! {
        #[test]
        fn cholesky_solve_inverts(vals in prop::collection::vec(-3f64..3f64, 9), rhs in prop::collection::vec(-5f64..5f64, 3)) {
            let p = spd(&vals, 3);
            let lower = cholesky_lower(p.as_ref()).unwrap();
            let x = cholesky_solve(lower.as_ref(), &rhs);
            for i in 0..3 {
                let back: f64 = (0..3).map(|j| p[(i, j)] * x[j]).sum();
                prop_assert!((back - rhs[i]).abs() < 1e-8);
            }
        }

        #[test]
        fn complement_is_orthogonal(vals in prop::collection::vec(-3f64..3f64, 16), skip in 0usize..4) {
            let m = spd(&vals, 4);
            let w = orthogonal_complement(m.as_ref(), skip);
            prop_assert!((dot(&w, &w) - 1f64).abs() < 1e-10);
            for j in (0..4).filter(|&j| j != skip) {
                let col: Vec<f64> = (0..4).map(|i| m[(i, j)]).collect();
                prop_assert!(dot(&w, &col).abs() < 1e-8 * (1f64 + dot(&col, &col).sqrt()));
            }
        }
    }

    #[test]
    fn non_positive_definite_has_no_cholesky() {
        let mut m = Mat::<f64>::identity(3, 3);
        m[(2, 2)] = -1f64;
        assert!(cholesky_lower(m.as_ref()).is_none());
        m[(2, 2)] = f64::NAN;
        assert!(cholesky_lower(m.as_ref()).is_none());

        let mut rng = StdRng::seed_from_u64(3);
        assert!(sample_from_precision(m.as_ref(), &[0., 0., 0.], &mut rng).is_none());
    }

    #[test]
    fn precision_draws_have_right_moments() {
        let mut p = Mat::<f64>::zeros(2, 2);
        p[(0, 0)] = 4.;
        p[(1, 1)] = 0.25;
        let location = [8., 1.];
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 20_000;
        let mut sum = [0f64; 2];
        let mut sq = [0f64; 2];
        for _ in 0..draws {
            let x = sample_from_precision(p.as_ref(), &location, &mut rng).unwrap();
            for i in 0..2 {
                sum[i] += x[i];
                sq[i] += x[i] * x[i];
            }
        }
        let mean = [sum[0] / draws as f64, sum[1] / draws as f64];
        let var = [
            sq[0] / draws as f64 - mean[0] * mean[0],
            sq[1] / draws as f64 - mean[1] * mean[1],
        ];
        assert_abs_diff_eq!(mean[0], 2., epsilon = 0.05);
        assert_abs_diff_eq!(mean[1], 4., epsilon = 0.1);
        assert_abs_diff_eq!(var[0], 0.25, epsilon = 0.02);
        assert_abs_diff_eq!(var[1], 4., epsilon = 0.2);
    }

    #[test]
    fn determinant_and_conditioning() {
        let mut b = Mat::<f64>::identity(2, 2);
        b[(1, 0)] = 0.5;
        b[(1, 1)] = 2.;
        assert_abs_diff_eq!(abs_determinant(b.as_ref()).unwrap(), 2., epsilon = 1e-12);
        assert!(is_invertible(b.as_ref(), 1e-10));

        let singular = Mat::from_fn(2, 2, |i, _| (i + 1) as f64);
        assert_abs_diff_eq!(abs_determinant(singular.as_ref()).unwrap(), 0., epsilon = 1e-12);
        assert!(!is_invertible(singular.as_ref(), 1e-10));

        let wide = Mat::<f64>::zeros(2, 3);
        assert!(matches!(
            abs_determinant(wide.as_ref()),
            Err(SvarError::Configuration(_))
        ));
    }

    #[test]
    fn span_checks() {
        let basis = Mat::from_fn(3, 1, |i, _| if i == 2 { 0. } else { 1. });
        assert_abs_diff_eq!(
            span_residual(basis.as_ref(), &[2., 2., 0.]).unwrap(),
            0.,
            epsilon = 1e-12
        );
        assert!(span_residual(basis.as_ref(), &[1., 0., 0.]).unwrap() > 0.1);

        let proj = project_onto_span(basis.as_ref(), &[1., 0., 5.]).unwrap();
        assert_eq!(proj.len(), 3);
        assert_abs_diff_eq!(proj[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(proj[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(proj[2], 0., epsilon = 1e-12);

        let dependent = Mat::from_fn(3, 2, |i, _| i as f64);
        assert!(span_residual(dependent.as_ref(), &[1., 0., 0.]).is_none());
    }

    #[test]
    fn inverse_of_triangular() {
        let mut b = Mat::<f64>::identity(2, 2);
        b[(1, 0)] = 0.5;
        let inv = inverse(b.as_ref());
        assert_abs_diff_eq!(inv[(0, 0)], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(inv[(1, 0)], -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(inv[(0, 1)], 0., epsilon = 1e-12);
        assert_abs_diff_eq!(inv[(1, 1)], 1., epsilon = 1e-12);
    }
}
