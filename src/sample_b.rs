//! Column-by-column draw of the structural matrix under zero restrictions,
//! following Waggoner and Zha (2003).

use faer::{Mat, MatRef};
use rand::Rng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};

use crate::error::{Component, NumericalFailure};
use crate::math::{
    backward_substitute_transposed, cholesky_lower, dot, forward_substitute,
    orthogonal_complement,
};
use crate::model::SvarModel;
use crate::normalisation::Normalisation;
use crate::state::Hyper;

fn failure(reason: impl Into<String>) -> NumericalFailure {
    NumericalFailure::new(Component::Structural, reason)
}

/// Redraw every column of `b` inside the span of its restriction basis.
///
/// Column `n` is `VB[n] β` where the density of `β` is proportional to
/// `|det B|^ν exp(−½ βᵀ S_n β)`. With `S_n = L Lᵀ` and `γ = Lᵀ β`, the
/// determinant is linear in `γ` along a single unit direction `w₁`, so `γ` is
/// drawn as a scaled chi along `w₁` plus a standard normal orthogonal to it.
pub(crate) fn sample_b<R: Rng + ?Sized>(
    model: &SvarModel,
    a: MatRef<'_, f64>,
    b: &mut Mat<f64>,
    hyper: &Hyper,
    normalisation: Normalisation,
    rng: &mut R,
) -> Result<(), NumericalFailure> {
    if !(hyper.gamma_b.is_finite() && hyper.gamma_b > 0f64) {
        return Err(failure(format!(
            "gamma_B must be positive, got {}",
            hyper.gamma_b
        )));
    }

    let n = model.dims().n;
    let prior = model.prior();
    let residuals = model.data().residuals(a);
    let rr = residuals.as_ref() * residuals.transpose();
    let scale = Mat::from_fn(n, n, |i, j| prior.b_v_inv[(i, j)] / hyper.gamma_b + rr[(i, j)]);

    let dof = model.structural_dof();
    let chi = ChiSquared::new(dof + 1.)
        .map_err(|err| failure(format!("invalid degrees of freedom {}: {}", dof + 1., err)))?;

    for col in 0..n {
        let basis = model.restrictions().basis(col);
        let free = basis.ncols();

        let projected = scale.as_ref() * basis;
        let scale_n = basis.transpose() * projected.as_ref();
        let lower = cholesky_lower(scale_n.as_ref()).ok_or_else(|| {
            failure(format!(
                "restricted scale matrix of column {} is not positive definite",
                col
            ))
        })?;

        let w = orthogonal_complement(b.as_ref(), col);
        let mut w1: Vec<f64> = (0..free)
            .map(|j| (0..n).map(|i| basis[(i, j)] * w[i]).sum())
            .collect();
        forward_substitute(lower.as_ref(), &mut w1);
        let norm = dot(&w1, &w1).sqrt();
        if !(norm.is_finite() && norm > f64::EPSILON) {
            return Err(failure(format!(
                "column {} has no direction that keeps B invertible",
                col
            )));
        }
        w1.iter_mut().for_each(|val| *val /= norm);

        let magnitude = chi.sample(rng).sqrt();
        let alpha = if rng.random_bool(0.5) {
            magnitude
        } else {
            -magnitude
        };
        let z: Vec<f64> = (0..free).map(|_| StandardNormal.sample(rng)).collect();
        let along = dot(&w1, &z);
        let mut beta: Vec<f64> = (0..free)
            .map(|j| alpha * w1[j] + z[j] - along * w1[j])
            .collect();
        backward_substitute_transposed(lower.as_ref(), &mut beta);

        for i in 0..n {
            b[(i, col)] = (0..free).map(|j| basis[(i, j)] * beta[j]).sum();
        }
        normalisation.apply(b, col);
    }
    Ok(())
}
