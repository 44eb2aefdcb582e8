//! The validated inputs of a run.

use faer::{Mat, MatRef};
use log::debug;

use crate::data::SvarData;
use crate::error::{check_shape, Result, SvarError};
use crate::math::{is_invertible, mat_all_finite, span_residual};
use crate::prior::Prior;
use crate::restrictions::Restrictions;
use crate::state::SvarState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    /// variables
    pub n: usize,
    /// regressors
    pub k: usize,
    /// periods
    pub t: usize,
}

/// Data, prior and restrictions, checked for consistency once so that the
/// samplers can rely on matching dimensions.
#[derive(Debug, Clone)]
pub struct SvarModel {
    data: SvarData,
    prior: Prior,
    restrictions: Restrictions,
    dims: Dims,
    xx: Mat<f64>,
}

impl SvarModel {
    pub fn new(data: SvarData, prior: Prior, restrictions: Restrictions) -> Result<Self> {
        let dims = Dims {
            n: data.num_variables(),
            k: data.num_regressors(),
            t: data.num_periods(),
        };
        prior.validate(dims.n, dims.k)?;
        restrictions.validate(dims.n)?;
        let xx = data.x() * data.x().transpose();
        debug!(
            "SVAR model with N = {}, K = {}, T = {}, free structural coefficients = {}",
            dims.n,
            dims.k,
            dims.t,
            restrictions.free_counts().sum::<usize>()
        );
        Ok(Self {
            data,
            prior,
            restrictions,
            dims,
            xx,
        })
    }

    pub fn data(&self) -> &SvarData {
        &self.data
    }

    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    pub fn restrictions(&self) -> &Restrictions {
        &self.restrictions
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// `X Xᵀ`
    pub(crate) fn xx(&self) -> MatRef<'_, f64> {
        self.xx.as_ref()
    }

    /// Degrees of freedom of the structural posterior, `T + b_nu − N`.
    pub(crate) fn structural_dof(&self) -> f64 {
        self.dims.t as f64 + self.prior.b_nu - self.dims.n as f64
    }

    /// Check that `state` can start a chain of this model.
    pub fn check_state(
        &self,
        state: &SvarState,
        restriction_tol: f64,
        invertibility_tol: f64,
    ) -> Result<()> {
        let Dims { n, k, .. } = self.dims;
        check_shape("starting A", state.a.as_ref(), n, k)?;
        check_shape("starting B", state.b.as_ref(), n, n)?;
        if !mat_all_finite(&state.a.as_ref()) || !mat_all_finite(&state.b.as_ref()) {
            return Err(SvarError::config(
                "starting A and B must only contain finite values",
            ));
        }
        if !state.hyper.all_positive() {
            return Err(SvarError::config(format!(
                "starting hyperparameters must be positive, got {:?}",
                state.hyper.to_array()
            )));
        }
        for column in 0..n {
            let values: Vec<f64> = (0..n).map(|i| state.b[(i, column)]).collect();
            let residual = span_residual(self.restrictions.basis(column), &values)
                .ok_or_else(|| SvarError::restriction(column, "the basis is rank deficient"))?;
            if residual > restriction_tol {
                return Err(SvarError::restriction(
                    column,
                    format!(
                        "the starting column is outside the restriction span (residual {:.3e})",
                        residual
                    ),
                ));
            }
        }
        if !is_invertible(state.b.as_ref(), invertibility_tol) {
            return Err(SvarError::config("starting B must be invertible"));
        }
        Ok(())
    }
}
