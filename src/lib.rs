//! Gibbs sampler for the posterior of a homoskedastic Bayesian structural
//! vector autoregression
//!
//! ```text
//! Bᵀ (Y − A X) = U,   U[:, t] ~ N(0, I)
//! ```
//!
//! with a hierarchical shrinkage prior on `A` and `B` and linear zero
//! restrictions on the columns of `B`.
//!
//! Each draw updates the shrinkage hyperparameters, then the rows of `A`
//! (Chan, Koop and Yu), then the columns of `B` (Waggoner and Zha).
//!
//! ```no_run
//! use bsvar_rs::{sample, GibbsSettings, NoHooks, Prior, Restrictions, SvarData, SvarModel, SvarState};
//! # fn series() -> faer::Mat<f64> { unimplemented!() }
//!
//! let data = SvarData::from_series(series().as_ref(), 1, true)?;
//! let model = SvarModel::new(data, Prior::minnesota(2, 1, 1), Restrictions::lower_triangular(2))?;
//! let start = SvarState::initial(&model);
//! let output = sample(&model, &start, &GibbsSettings::default(), &mut NoHooks)?;
//! println!("{:?}", output.posterior.mean_b());
//! # Ok::<(), bsvar_rs::SvarError>(())
//! ```

pub(crate) mod chain;
pub(crate) mod data;
pub(crate) mod error;
pub(crate) mod hyper;
pub(crate) mod math;
pub(crate) mod model;
pub(crate) mod normalisation;
pub(crate) mod posterior;
pub(crate) mod prior;
pub(crate) mod restrictions;
pub(crate) mod sample_a;
pub(crate) mod sample_b;
pub(crate) mod sampler;
pub(crate) mod state;

pub use chain::{Chain, GibbsChain};
pub use data::SvarData;
pub use error::{Component, NumericalFailure, Result, SvarError};
pub use math::abs_determinant;
pub use model::{Dims, SvarModel};
pub use normalisation::{normalise_wz2003, Normalisation};
pub use posterior::Posterior;
pub use prior::Prior;
pub use restrictions::Restrictions;
pub use sampler::{
    bsvar, sample, sample_sequentially, FnHooks, GibbsSettings, NoHooks, Progress, RunStatus,
    SamplerHooks, SamplerOutput,
};
pub use state::{Hyper, SvarState};
