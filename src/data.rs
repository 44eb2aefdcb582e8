//! Observation matrices of the reduced form `Y = A X + E`.

use faer::{Mat, MatRef};

use crate::error::{Result, SvarError};
use crate::math::mat_all_finite;

/// Dependent variables `Y` (N×T) and regressors `X` (K×T).
#[derive(Debug, Clone)]
pub struct SvarData {
    y: Mat<f64>,
    x: Mat<f64>,
}

impl SvarData {
    pub fn new(y: Mat<f64>, x: Mat<f64>) -> Result<Self> {
        if y.nrows() == 0 || y.ncols() == 0 {
            return Err(SvarError::config("Y must have at least one variable and one period"));
        }
        if x.nrows() == 0 {
            return Err(SvarError::config("X must have at least one regressor"));
        }
        if x.ncols() != y.ncols() {
            return Err(SvarError::config(format!(
                "Y has {} periods but X has {}",
                y.ncols(),
                x.ncols()
            )));
        }
        if !mat_all_finite(&y.as_ref()) || !mat_all_finite(&x.as_ref()) {
            return Err(SvarError::config("Y and X must only contain finite values"));
        }
        Ok(Self { y, x })
    }

    /// Build `Y` and `X` from a series whose rows are periods and whose
    /// columns are variables.
    ///
    /// `X` stacks the first lag of all variables, then the second lag and so
    /// on, followed by a row of ones if `constant` is set. The first `lags`
    /// periods are used up as initial conditions.
    pub fn from_series(series: MatRef<'_, f64>, lags: usize, constant: bool) -> Result<Self> {
        let (periods, n) = series.shape();
        if lags == 0 {
            return Err(SvarError::config("at least one lag is required"));
        }
        if periods <= lags {
            return Err(SvarError::config(format!(
                "a series of {} periods is too short for {} lags",
                periods, lags
            )));
        }
        let t = periods - lags;
        let k = n * lags + usize::from(constant);

        let y = Mat::from_fn(n, t, |i, s| series[(s + lags, i)]);
        let x = Mat::from_fn(k, t, |row, s| {
            if row < n * lags {
                let lag = row / n + 1;
                let var = row % n;
                series[(s + lags - lag, var)]
            } else {
                1f64
            }
        });
        Self::new(y, x)
    }

    pub fn y(&self) -> MatRef<'_, f64> {
        self.y.as_ref()
    }

    pub fn x(&self) -> MatRef<'_, f64> {
        self.x.as_ref()
    }

    pub fn num_variables(&self) -> usize {
        self.y.nrows()
    }

    pub fn num_regressors(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_periods(&self) -> usize {
        self.y.ncols()
    }

    /// `Y − A X`
    pub(crate) fn residuals(&self, a: MatRef<'_, f64>) -> Mat<f64> {
        let fitted = a * self.x.as_ref();
        Mat::from_fn(self.y.nrows(), self.y.ncols(), |i, t| {
            self.y[(i, t)] - fitted[(i, t)]
        })
    }
}
