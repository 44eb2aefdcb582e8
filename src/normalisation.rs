//! Sign normalisation of the structural matrix.
//!
//! Flipping the sign of a column of `B` leaves the likelihood and the prior
//! unchanged, so the posterior is symmetric in those signs. A normalisation
//! picks one representative per draw.

use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};

use crate::error::{check_shape, Result, SvarError};
use crate::math::{inverse, is_invertible};
use crate::posterior::Posterior;

/// Normalisation applied to every column right after it is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalisation {
    #[default]
    None,
    /// Flip column `n` whenever `B[n, n]` is negative.
    PositiveDiagonal,
}

impl Normalisation {
    pub(crate) fn apply(&self, b: &mut Mat<f64>, column: usize) {
        match self {
            Normalisation::None => {}
            Normalisation::PositiveDiagonal => {
                if b[(column, column)] < 0f64 {
                    flip_column(b, column);
                }
            }
        }
    }
}

fn flip_column(b: &mut Mat<f64>, column: usize) {
    for i in 0..b.nrows() {
        b[(i, column)] = -b[(i, column)];
    }
}

/// Waggoner and Zha (2003) normalisation of recorded draws of `B`.
///
/// For every draw and shock `n`, column `n` of `B` is flipped when the impact
/// vector `θ_n` (column `n` of `B⁻ᵀ`) points away from the reference impact
/// vector `θ̂_n` of `b_hat` in the metric `Σ̂⁻¹ = b_hat b_hatᵀ`. Since
/// `Σ̂⁻¹ θ̂_n` is column `n` of `b_hat`, the criterion is
/// `θ_nᵀ b_hat[:, n] < 0`.
pub fn normalise_wz2003(posterior: &mut Posterior, b_hat: MatRef<'_, f64>) -> Result<()> {
    let Some(first) = posterior.b.first() else {
        return Ok(());
    };
    let n = first.nrows();
    check_shape("reference B", b_hat, n, n)?;
    if !is_invertible(b_hat, 1e-10) {
        return Err(SvarError::config("reference B must be invertible"));
    }
    for b in posterior.b.iter_mut() {
        let theta = inverse(b.transpose());
        for shock in 0..n {
            let alignment: f64 = (0..n).map(|i| theta[(i, shock)] * b_hat[(i, shock)]).sum();
            if alignment < 0f64 {
                flip_column(b, shock);
            }
        }
    }
    Ok(())
}
