use faer::Mat;
use itertools::Itertools;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, GibbsChain};
use crate::data::SvarData;
use crate::error::{Result, SvarError};
use crate::model::SvarModel;
use crate::normalisation::Normalisation;
use crate::posterior::Posterior;
use crate::prior::Prior;
use crate::restrictions::Restrictions;
use crate::state::SvarState;

/// Settings of a Gibbs run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GibbsSettings {
    /// The number of draws to record.
    pub num_draws: u64,
    pub seed: u64,
    /// Chain id, also the stream of the random number generator.
    pub chain: u64,
    /// Maximum number of progress reports of a run.
    pub progress_reports: u64,
    /// Cancellation is polled every `cancel_check_stride` iterations.
    pub cancel_check_stride: u64,
    pub normalisation: Normalisation,
    /// Smallest accepted `min |R_ii| / max |R_ii|` of the QR decomposition of `B`.
    pub invertibility_tol: f64,
    /// Largest accepted distance of a starting column of `B` from its
    /// restriction span, relative to the column norm.
    pub restriction_tol: f64,
}

impl Default for GibbsSettings {
    fn default() -> Self {
        Self {
            num_draws: 1000,
            seed: 0,
            chain: 0,
            progress_reports: 50,
            cancel_check_stride: 200,
            normalisation: Normalisation::None,
            invertibility_tol: 1e-10,
            restriction_tol: 1e-8,
        }
    }
}

impl GibbsSettings {
    pub fn new_chain<'model>(&self, model: &'model SvarModel) -> GibbsChain<'model, ChaCha8Rng> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(self.chain);
        GibbsChain::new(model, *self, rng)
    }

    fn validate(&self) -> Result<()> {
        if self.num_draws == 0 {
            return Err(SvarError::config("the number of draws must be positive"));
        }
        if self.cancel_check_stride == 0 {
            return Err(SvarError::config("cancel_check_stride must be positive"));
        }
        let tolerances = [
            ("invertibility_tol", self.invertibility_tol),
            ("restriction_tol", self.restriction_tol),
        ];
        for (name, val) in tolerances {
            if !val.is_finite() || val < 0f64 {
                return Err(SvarError::config(format!(
                    "{} must be a non-negative number, got {}",
                    name, val
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Progress {
    /// Completed draws.
    pub draw: u64,
    pub chain: u64,
    pub num_draws: u64,
}

/// Callbacks of a host that shows progress or wants to interrupt a run.
pub trait SamplerHooks {
    fn report_progress(&mut self, _progress: &Progress) {}

    fn should_cancel(&mut self) -> bool {
        false
    }
}

pub struct NoHooks;

impl SamplerHooks for NoHooks {}

/// Hooks made of a progress closure and a cancellation closure.
pub struct FnHooks<P, C> {
    pub progress: P,
    pub cancel: C,
}

impl<P, C> SamplerHooks for FnHooks<P, C>
where
    P: FnMut(&Progress),
    C: FnMut() -> bool,
{
    fn report_progress(&mut self, progress: &Progress) {
        (self.progress)(progress)
    }

    fn should_cancel(&mut self) -> bool {
        (self.cancel)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// The host cancelled the run after `completed` draws.
    Cancelled { completed: u64 },
}

#[derive(Debug, Clone)]
pub struct SamplerOutput {
    pub posterior: Posterior,
    /// Usable as the starting values of a continuation run.
    pub last_draw: SvarState,
    pub status: RunStatus,
}

/// `round(linspace(0, num_draws, reports))` without duplicates.
fn progress_points(num_draws: u64, reports: u64) -> Vec<u64> {
    // there are only `num_draws + 1` distinct points
    let reports = reports.min(num_draws.saturating_add(1));
    match reports {
        0 => vec![],
        1 => vec![num_draws],
        _ => (0..reports)
            .map(|i| (i as f64 * num_draws as f64 / (reports - 1) as f64).round() as u64)
            .dedup()
            .collect(),
    }
}

/// Run the Gibbs sampler for `settings.num_draws` iterations from `start`.
pub fn sample<H: SamplerHooks + ?Sized>(
    model: &SvarModel,
    start: &SvarState,
    settings: &GibbsSettings,
    hooks: &mut H,
) -> Result<SamplerOutput> {
    settings.validate()?;
    let dims = model.dims();
    info!(
        "Starting Gibbs sampler for chain {} with {} draws (N = {}, K = {}, T = {})",
        settings.chain, settings.num_draws, dims.n, dims.k, dims.t
    );

    let mut chain = settings.new_chain(model);
    chain.set_position(start)?;

    let num_draws = settings.num_draws;
    let points = progress_points(num_draws, settings.progress_reports);
    let mut next_point = points.iter().copied().peekable();
    let progress = |draw| Progress {
        draw,
        chain: settings.chain,
        num_draws,
    };

    let mut posterior = Posterior::try_with_capacity(num_draws)?;
    let mut status = RunStatus::Completed;
    for s in 0..num_draws {
        if s % settings.cancel_check_stride == 0 && hooks.should_cancel() {
            warn!("Chain {} cancelled after {} draws", settings.chain, s);
            status = RunStatus::Cancelled { completed: s };
            break;
        }
        if next_point.next_if_eq(&s).is_some() {
            debug!("Chain {}: {} of {} draws", settings.chain, s, num_draws);
            hooks.report_progress(&progress(s));
        }
        chain.step()?;
        if let Some(state) = chain.position() {
            posterior.push(state);
        }
    }
    if status == RunStatus::Completed && next_point.next_if_eq(&num_draws).is_some() {
        hooks.report_progress(&progress(num_draws));
    }

    let last_draw = chain
        .into_position()
        .ok_or_else(|| SvarError::config("the chain has no position"))?;
    info!(
        "Chain {} finished with {} draws",
        settings.chain,
        posterior.len()
    );
    Ok(SamplerOutput {
        posterior,
        last_draw,
        status,
    })
}

/// Sample `settings.num_draws` draws lazily, one Gibbs cycle per item.
pub fn sample_sequentially<'model>(
    model: &'model SvarModel,
    start: &SvarState,
    settings: &GibbsSettings,
) -> Result<impl Iterator<Item = Result<(SvarState, Progress)>> + 'model> {
    settings.validate()?;
    let mut chain = settings.new_chain(model);
    chain.set_position(start)?;
    Ok((0..settings.num_draws).map(move |_| chain.draw()))
}

/// Run `s` draws on raw inputs: data `y` (N×T) and `x` (K×T), one restriction
/// basis per column of `B`, the prior and the starting values.
pub fn bsvar(
    s: u64,
    y: Mat<f64>,
    x: Mat<f64>,
    vb: Vec<Mat<f64>>,
    prior: Prior,
    starting_values: SvarState,
    settings: GibbsSettings,
) -> Result<SamplerOutput> {
    let data = SvarData::new(y, x)?;
    let model = SvarModel::new(data, prior, Restrictions::new(vb))?;
    let settings = GibbsSettings {
        num_draws: s,
        ..settings
    };
    sample(&model, &starting_values, &settings, &mut NoHooks)
}
