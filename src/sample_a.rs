//! Equation-by-equation draw of the autoregressive matrix.

use faer::{Mat, MatRef};
use rand::Rng;

use crate::error::{Component, NumericalFailure};
use crate::math::{dot, sample_from_precision};
use crate::model::SvarModel;
use crate::state::Hyper;

/// Redraw every row of `a` from its full conditional given `b`.
///
/// Rows are drawn in index order and each one sees the rows already redrawn
/// in this pass through a shared residual buffer `Y − A X`.
pub(crate) fn sample_a<R: Rng + ?Sized>(
    model: &SvarModel,
    a: &mut Mat<f64>,
    b: MatRef<'_, f64>,
    hyper: &Hyper,
    rng: &mut R,
) -> Result<(), NumericalFailure> {
    if !(hyper.gamma_a.is_finite() && hyper.gamma_a > 0f64) {
        return Err(NumericalFailure::new(
            Component::Autoregressive,
            format!("gamma_A must be positive, got {}", hyper.gamma_a),
        ));
    }

    let dims = model.dims();
    let x = model.data().x();
    let xx = model.xx();
    let prior = model.prior();
    let scaled_prior = Mat::from_fn(dims.k, dims.k, |i, j| prior.a_v_inv[(i, j)] / hyper.gamma_a);

    let mut residuals = model.data().residuals(a.as_ref());
    let mut row = vec![0f64; dims.k];
    let mut bc = vec![0f64; dims.n];
    let mut loading = vec![0f64; dims.t];

    for eq in 0..dims.n {
        // Residuals with equation `eq` removed from the fit.
        (0..dims.k).for_each(|j| row[j] = a[(eq, j)]);
        for t in 0..dims.t {
            let fit: f64 = (0..dims.k).map(|j| row[j] * x[(j, t)]).sum();
            residuals[(eq, t)] += fit;
        }

        let c: Vec<f64> = (0..dims.n).map(|j| b[(eq, j)]).collect();
        let cc = dot(&c, &c);
        for (i, val) in bc.iter_mut().enumerate() {
            *val = (0..dims.n).map(|j| b[(i, j)] * c[j]).sum();
        }
        for (t, val) in loading.iter_mut().enumerate() {
            *val = (0..dims.n).map(|i| residuals[(i, t)] * bc[i]).sum();
        }

        let precision = Mat::from_fn(dims.k, dims.k, |i, j| scaled_prior[(i, j)] + cc * xx[(i, j)]);
        let location: Vec<f64> = (0..dims.k)
            .map(|i| {
                let prior_part: f64 = (0..dims.k)
                    .map(|j| scaled_prior[(i, j)] * prior.a[(eq, j)])
                    .sum();
                let data_part: f64 = (0..dims.t).map(|t| x[(i, t)] * loading[t]).sum();
                prior_part + data_part
            })
            .collect();

        let draw = sample_from_precision(precision.as_ref(), &location, rng).ok_or_else(|| {
            NumericalFailure::new(
                Component::Autoregressive,
                format!("posterior precision of row {} is not positive definite", eq),
            )
        })?;

        for (j, &val) in draw.iter().enumerate() {
            a[(eq, j)] = val;
        }
        for t in 0..dims.t {
            let fit: f64 = (0..dims.k).map(|j| draw[j] * x[(j, t)]).sum();
            residuals[(eq, t)] -= fit;
        }
    }
    Ok(())
}
