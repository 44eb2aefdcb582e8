use std::fmt;

use thiserror::Error;

/// The conditional sampler a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Hyperparameters,
    Autoregressive,
    Structural,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Hyperparameters => write!(f, "hyperparameter sampler"),
            Component::Autoregressive => write!(f, "A-row sampler"),
            Component::Structural => write!(f, "B-column sampler"),
        }
    }
}

/// A conditional draw that could not be completed.
///
/// The samplers do not know which iteration they are running in, the chain
/// attaches that when it wraps the failure into [`SvarError::Numerical`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{component} failed: {reason}")]
pub struct NumericalFailure {
    pub component: Component,
    pub reason: String,
}

impl NumericalFailure {
    pub(crate) fn new(component: Component, reason: impl Into<String>) -> Self {
        Self {
            component,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Restriction basis for column {column} cannot support a non-degenerate draw: {reason}")]
    Restriction { column: usize, reason: String },
    #[error("Numerical failure at iteration {iteration}")]
    Numerical {
        iteration: u64,
        #[source]
        source: NumericalFailure,
    },
}

impl SvarError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SvarError::Configuration(msg.into())
    }

    pub(crate) fn restriction(column: usize, reason: impl Into<String>) -> Self {
        SvarError::Restriction {
            column,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SvarError>;

/// Fail with a configuration error unless `mat` has the given shape.
pub(crate) fn check_shape(
    name: &str,
    mat: faer::MatRef<'_, f64>,
    nrows: usize,
    ncols: usize,
) -> Result<()> {
    if mat.nrows() != nrows || mat.ncols() != ncols {
        return Err(SvarError::config(format!(
            "{} must be {}x{}, got {}x{}",
            name,
            nrows,
            ncols,
            mat.nrows(),
            mat.ncols()
        )));
    }
    Ok(())
}
