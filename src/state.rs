use faer::Mat;

use crate::error::{Result, SvarError};
use crate::math::{project_onto_span, qr_conditioning};
use crate::model::SvarModel;

/// Shrinkage hyperparameters of the hierarchical prior.
///
/// The array order used by [`Hyper::to_array`] and the rows of
/// [`crate::Posterior::hyper_matrix`] is `(γ_A, γ_B, s_A, s_B, s_γ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyper {
    pub gamma_a: f64,
    pub gamma_b: f64,
    pub s_a: f64,
    pub s_b: f64,
    pub s_gamma: f64,
}

impl Hyper {
    pub const LEN: usize = 5;

    pub fn from_slice(vals: &[f64]) -> Result<Self> {
        let &[gamma_a, gamma_b, s_a, s_b, s_gamma] = vals else {
            return Err(SvarError::config(format!(
                "hyper must have {} entries, got {}",
                Self::LEN,
                vals.len()
            )));
        };
        Ok(Self {
            gamma_a,
            gamma_b,
            s_a,
            s_b,
            s_gamma,
        })
    }

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [self.gamma_a, self.gamma_b, self.s_a, self.s_b, self.s_gamma]
    }

    pub fn all_positive(&self) -> bool {
        self.to_array()
            .iter()
            .all(|&val| val.is_finite() && val > 0f64)
    }
}

impl Default for Hyper {
    fn default() -> Self {
        Self {
            gamma_a: 1.,
            gamma_b: 1.,
            s_a: 1.,
            s_b: 1.,
            s_gamma: 1.,
        }
    }
}

/// Position of the Gibbs chain.
///
/// Used for starting values, for every recorded draw and for the last draw of
/// a run, which can be passed verbatim to the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct SvarState {
    /// N×K autoregressive matrix
    pub a: Mat<f64>,
    /// N×N structural matrix, column `n` is structural equation `n`
    pub b: Mat<f64>,
    pub hyper: Hyper,
}

impl SvarState {
    pub fn new(a: Mat<f64>, b: Mat<f64>, hyper: Hyper) -> Self {
        Self { a, b, hyper }
    }

    /// A at the prior mean, unit hyperparameters, and every column of B the
    /// projection of a unit vector onto its restriction span.
    ///
    /// Column `n` tries `e_n` first, then `e_{n+1}`, … (cyclically), and keeps
    /// the first projection that is linearly independent of the columns
    /// before it. Patterns that restrict the diagonal, such as an
    /// anti-diagonal `B`, thus still get an invertible start. If no unit
    /// vector works the start is singular and is rejected when the chain is
    /// positioned; pass explicit starting values in that case.
    pub fn initial(model: &SvarModel) -> Self {
        let n = model.dims().n;
        let mut b = Mat::<f64>::zeros(n, n);
        for col in 0..n {
            let basis = model.restrictions().basis(col);
            let candidates = (0..n).filter_map(|shift| {
                let row = (col + shift) % n;
                let unit: Vec<f64> = (0..n).map(|i| if i == row { 1. } else { 0. }).collect();
                project_onto_span(basis, &unit)
            });
            let mut chosen = None;
            for proj in candidates {
                set_column(&mut b, col, &proj);
                if qr_conditioning(b.as_ref().subcols(0, col + 1)) > START_TOL {
                    chosen = Some(proj);
                    break;
                }
            }
            set_column(&mut b, col, &chosen.unwrap_or_else(|| vec![0f64; n]));
        }
        Self {
            a: model.prior().a.clone(),
            b,
            hyper: Hyper::default(),
        }
    }
}

const START_TOL: f64 = 1e-8;

fn set_column(b: &mut Mat<f64>, col: usize, vals: &[f64]) {
    for (i, &val) in vals.iter().enumerate() {
        b[(i, col)] = val;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::test_data;
    use crate::{Prior, Restrictions};

    #[test]
    fn hyper_array_order() {
        let hyper = Hyper::from_slice(&[1., 2., 3., 4., 5.]).unwrap();
        assert_eq!(hyper.gamma_b, 2.);
        assert_eq!(hyper.s_gamma, 5.);
        assert_eq!(hyper.to_array(), [1., 2., 3., 4., 5.]);
        assert!(hyper.all_positive());

        assert!(Hyper::from_slice(&[1., 2.]).is_err());
        let hyper = Hyper::from_slice(&[1., 2., 0., 4., 5.]).unwrap();
        assert!(!hyper.all_positive());
    }

    #[test]
    fn initial_state_conforms() {
        let data = test_data::simulate(&test_data::true_a(), &test_data::true_b(), 30, 4);
        let model = SvarModel::new(
            data,
            Prior::minnesota(2, 1, 1),
            Restrictions::lower_triangular(2),
        )
        .unwrap();
        let state = SvarState::initial(&model);
        assert_eq!(state.a, model.prior().a);
        assert_eq!(state.b, Mat::<f64>::identity(2, 2));
        assert_eq!(state.hyper, Hyper::default());
        assert!(model.check_state(&state, 1e-8, 1e-10).is_ok());
    }

    #[test]
    fn initial_state_with_restricted_diagonal() {
        // anti-diagonal B: every diagonal entry is restricted to zero
        for n in [2usize, 3] {
            let pattern: Vec<Vec<bool>> = (0..n)
                .map(|i| (0..n).map(|j| i + j == n - 1).collect())
                .collect();
            let mut series = Mat::<f64>::zeros(40, n);
            for t in 0..40 {
                for i in 0..n {
                    series[(t, i)] = ((3 * t + 5 * i) % 7) as f64 - 3.;
                }
            }
            let data = crate::SvarData::from_series(series.as_ref(), 1, true).unwrap();
            let model = SvarModel::new(
                data,
                Prior::minnesota(n, 1, 1),
                Restrictions::from_pattern(&pattern),
            )
            .unwrap();
            let state = SvarState::initial(&model);
            for i in 0..n {
                assert_eq!(state.b[(i, n - 1 - i)], 1.);
                assert_eq!(state.b[(i, i)], if 2 * i == n - 1 { 1. } else { 0. });
            }
            assert!(model.check_state(&state, 1e-8, 1e-10).is_ok());
        }
    }
}
