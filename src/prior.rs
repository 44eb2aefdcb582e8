use faer::Mat;

use crate::error::{check_shape, Result, SvarError};
use crate::math::{cholesky_lower, mat_all_finite};

/// Prior of the homoskedastic SVAR.
///
/// Rows of `A` are normal around the rows of `a` with precision
/// `a_v_inv / γ_A`. Columns of `B` follow a generalised-normal prior with
/// precision `b_v_inv / γ_B` and shape `b_nu`. The overall shrinkage
/// parameters `γ_A` and `γ_B` get a three level hierarchical prior governed by
/// `hyper_nu`, `hyper_a`, `hyper_v` and `hyper_s`.
#[derive(Debug, Clone)]
pub struct Prior {
    /// N×K prior mean of `A`
    pub a: Mat<f64>,
    /// K×K prior precision of every row of `A`
    pub a_v_inv: Mat<f64>,
    /// N×N prior precision of every column of `B`
    pub b_v_inv: Mat<f64>,
    /// Shape of the generalised-normal prior of `B`, at least N
    pub b_nu: f64,
    /// Shape of the inverted-gamma 2 prior of both overall shrinkage parameters
    pub hyper_nu: f64,
    /// Shape of the gamma prior of the scales of the overall shrinkage parameters
    pub hyper_a: f64,
    /// Shape of the level 3 inverted-gamma 2 prior
    pub hyper_v: f64,
    /// Scale of the level 3 inverted-gamma 2 prior
    pub hyper_s: f64,
}

impl Prior {
    /// Minnesota-style default for `n` variables, `lags` lags and
    /// `deterministic` deterministic regressors.
    ///
    /// The prior mean of `A` is a random walk, the precision of lag `l`
    /// coefficients grows with `l²`.
    pub fn minnesota(n: usize, lags: usize, deterministic: usize) -> Self {
        let k = n * lags + deterministic;
        let a = Mat::from_fn(n, k, |i, j| if i == j { 1f64 } else { 0f64 });
        let a_v_inv = Mat::from_fn(k, k, |i, j| {
            if i != j {
                0f64
            } else if i < n * lags {
                let lag = (i / n + 1) as f64;
                lag * lag
            } else {
                1f64
            }
        });
        Self {
            a,
            a_v_inv,
            b_v_inv: Mat::identity(n, n),
            b_nu: n as f64,
            hyper_nu: 3.,
            hyper_a: 1.,
            hyper_v: 3.,
            hyper_s: 1.,
        }
    }

    pub(crate) fn validate(&self, n: usize, k: usize) -> Result<()> {
        check_shape("prior A", self.a.as_ref(), n, k)?;
        check_shape("prior A_V_inv", self.a_v_inv.as_ref(), k, k)?;
        check_shape("prior B_V_inv", self.b_v_inv.as_ref(), n, n)?;
        if !mat_all_finite(&self.a.as_ref()) {
            return Err(SvarError::config("prior A must only contain finite values"));
        }
        if cholesky_lower(self.a_v_inv.as_ref()).is_none() {
            return Err(SvarError::config("prior A_V_inv must be positive definite"));
        }
        if cholesky_lower(self.b_v_inv.as_ref()).is_none() {
            return Err(SvarError::config("prior B_V_inv must be positive definite"));
        }
        if !self.b_nu.is_finite() || self.b_nu < n as f64 {
            return Err(SvarError::config(format!(
                "prior B_nu must be at least N = {}, got {}",
                n, self.b_nu
            )));
        }
        let scalars = [
            ("hyper_nu", self.hyper_nu),
            ("hyper_a", self.hyper_a),
            ("hyper_V", self.hyper_v),
            ("hyper_S", self.hyper_s),
        ];
        for (name, val) in scalars {
            if !val.is_finite() || val <= 0f64 {
                return Err(SvarError::config(format!(
                    "prior {} must be positive, got {}",
                    name, val
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn minnesota_layout() {
        let prior = Prior::minnesota(2, 2, 1);
        assert_eq!(prior.a.shape(), (2, 5));
        assert_eq!(prior.a[(0, 0)], 1.);
        assert_eq!(prior.a[(1, 1)], 1.);
        assert_eq!(prior.a[(0, 2)], 0.);
        assert_eq!(prior.a_v_inv[(1, 1)], 1.);
        assert_eq!(prior.a_v_inv[(2, 2)], 4.);
        assert_eq!(prior.a_v_inv[(3, 3)], 4.);
        assert_eq!(prior.a_v_inv[(4, 4)], 1.);
        assert_eq!(prior.b_nu, 2.);
        assert!(prior.validate(2, 5).is_ok());
    }

    #[test]
    fn degenerate_prior_is_rejected() {
        let mut prior = Prior::minnesota(2, 1, 1);
        prior.a_v_inv[(2, 2)] = 0.;
        assert!(matches!(
            prior.validate(2, 3),
            Err(SvarError::Configuration(_))
        ));

        let mut prior = Prior::minnesota(2, 1, 1);
        prior.hyper_s = -1.;
        assert!(prior.validate(2, 3).is_err());

        let mut prior = Prior::minnesota(2, 1, 1);
        prior.b_nu = 1.;
        assert!(prior.validate(2, 3).is_err());

        let prior = Prior::minnesota(2, 1, 1);
        assert!(prior.validate(3, 3).is_err());
    }
}
