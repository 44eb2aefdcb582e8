use faer::Mat;

use crate::error::{Result, SvarError};
use crate::state::{Hyper, SvarState};

/// Recorded draws of a run, slice `s` holds iteration `s`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Posterior {
    pub a: Vec<Mat<f64>>,
    pub b: Vec<Mat<f64>>,
    pub hyper: Vec<Hyper>,
}

impl Posterior {
    pub fn with_capacity(draws: usize) -> Self {
        Self {
            a: Vec::with_capacity(draws),
            b: Vec::with_capacity(draws),
            hyper: Vec::with_capacity(draws),
        }
    }

    /// Like [`Posterior::with_capacity`], but fails with a configuration
    /// error instead of aborting when `draws` slices cannot be allocated.
    pub fn try_with_capacity(draws: u64) -> Result<Self> {
        let draws = usize::try_from(draws).map_err(|_| {
            SvarError::config(format!("{} draws do not fit into memory", draws))
        })?;
        let mut posterior = Self::default();
        let reserved = posterior
            .a
            .try_reserve_exact(draws)
            .and_then(|_| posterior.b.try_reserve_exact(draws))
            .and_then(|_| posterior.hyper.try_reserve_exact(draws));
        reserved.map_err(|err| {
            SvarError::config(format!("cannot allocate storage for {} draws: {}", draws, err))
        })?;
        Ok(posterior)
    }

    pub(crate) fn push(&mut self, state: &SvarState) {
        self.a.push(state.a.clone());
        self.b.push(state.b.clone());
        self.hyper.push(state.hyper);
    }

    pub fn len(&self) -> usize {
        self.hyper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hyper.is_empty()
    }

    /// 5×S matrix with one column per draw, rows ordered as
    /// `(γ_A, γ_B, s_A, s_B, s_γ)`.
    pub fn hyper_matrix(&self) -> Mat<f64> {
        Mat::from_fn(Hyper::LEN, self.len(), |i, s| self.hyper[s].to_array()[i])
    }

    /// The draw of iteration `draw`.
    pub fn get(&self, draw: usize) -> Option<SvarState> {
        Some(SvarState::new(
            self.a.get(draw)?.clone(),
            self.b.get(draw)?.clone(),
            *self.hyper.get(draw)?,
        ))
    }

    pub fn last(&self) -> Option<SvarState> {
        self.get(self.len().checked_sub(1)?)
    }

    pub fn mean_a(&self) -> Option<Mat<f64>> {
        mean(&self.a, |a| a.clone())
    }

    pub fn mean_b(&self) -> Option<Mat<f64>> {
        mean(&self.b, |b| b.clone())
    }

    /// Posterior mean of the reduced-form error precision `B Bᵀ`, which does
    /// not depend on how the columns of `B` are rotated or signed.
    pub fn mean_error_precision(&self) -> Option<Mat<f64>> {
        mean(&self.b, |b| b.as_ref() * b.transpose())
    }

    /// Keep every draw from index `burn` onwards.
    pub fn discard(&mut self, burn: usize) {
        let burn = burn.min(self.len());
        self.a.drain(..burn);
        self.b.drain(..burn);
        self.hyper.drain(..burn);
    }

    /// Append the draws of a continuation run.
    pub fn extend(&mut self, other: Posterior) {
        self.a.extend(other.a);
        self.b.extend(other.b);
        self.hyper.extend(other.hyper);
    }
}

fn mean(draws: &[Mat<f64>], f: impl Fn(&Mat<f64>) -> Mat<f64>) -> Option<Mat<f64>> {
    let first = f(draws.first()?);
    let mut sum = Mat::<f64>::zeros(first.nrows(), first.ncols());
    for draw in draws {
        let val = f(draw);
        for j in 0..sum.ncols() {
            for i in 0..sum.nrows() {
                sum[(i, j)] += val[(i, j)];
            }
        }
    }
    let count = draws.len() as f64;
    Some(Mat::from_fn(sum.nrows(), sum.ncols(), |i, j| sum[(i, j)] / count))
}
