use rand::Rng;

use crate::error::{Component, NumericalFailure, Result, SvarError};
use crate::hyper::sample_hyperparameters;
use crate::math::is_invertible;
use crate::model::SvarModel;
use crate::sample_a::sample_a;
use crate::sample_b::sample_b;
use crate::sampler::{GibbsSettings, Progress};
use crate::state::SvarState;

/// Draw samples from the posterior distribution using Markov chain Monte Carlo.
pub trait Chain {
    /// Initialize the sampler to a position. This should be called
    /// before calling draw.
    ///
    /// This fails if the starting values do not fit the model.
    fn set_position(&mut self, position: &SvarState) -> Result<()>;

    /// Run one Gibbs cycle, updating the position in place.
    fn step(&mut self) -> Result<Progress>;

    /// The current position, if one was set.
    fn position(&self) -> Option<&SvarState>;

    /// Draw a new sample and return the position and the progress of the chain.
    fn draw(&mut self) -> Result<(SvarState, Progress)> {
        let progress = self.step()?;
        let position = self
            .position()
            .cloned()
            .ok_or_else(|| SvarError::config("the chain has no position"))?;
        Ok((position, progress))
    }
}

/// One chain of the Gibbs sampler. Every draw updates the hyperparameters,
/// then the rows of `A`, then the columns of `B`.
pub struct GibbsChain<'model, R: Rng> {
    model: &'model SvarModel,
    settings: GibbsSettings,
    rng: R,
    state: Option<SvarState>,
    draw_count: u64,
}

impl<'model, R: Rng> GibbsChain<'model, R> {
    pub fn new(model: &'model SvarModel, settings: GibbsSettings, rng: R) -> Self {
        GibbsChain {
            model,
            settings,
            rng,
            state: None,
            draw_count: 0,
        }
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub(crate) fn into_position(self) -> Option<SvarState> {
        self.state
    }
}

impl<R: Rng> Chain for GibbsChain<'_, R> {
    fn set_position(&mut self, position: &SvarState) -> Result<()> {
        self.model.check_state(
            position,
            self.settings.restriction_tol,
            self.settings.invertibility_tol,
        )?;
        self.state = Some(position.clone());
        Ok(())
    }

    fn step(&mut self) -> Result<Progress> {
        let iteration = self.draw_count;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| SvarError::config("set_position must be called before draw"))?;
        let at = |source: NumericalFailure| SvarError::Numerical { iteration, source };

        sample_hyperparameters(
            self.model,
            state.a.as_ref(),
            state.b.as_ref(),
            &mut state.hyper,
            &mut self.rng,
        )
        .map_err(at)?;
        sample_a(
            self.model,
            &mut state.a,
            state.b.as_ref(),
            &state.hyper,
            &mut self.rng,
        )
        .map_err(at)?;
        sample_b(
            self.model,
            state.a.as_ref(),
            &mut state.b,
            &state.hyper,
            self.settings.normalisation,
            &mut self.rng,
        )
        .map_err(at)?;
        if !is_invertible(state.b.as_ref(), self.settings.invertibility_tol) {
            return Err(at(NumericalFailure::new(
                Component::Structural,
                "B is singular after the column sweep",
            )));
        }

        self.draw_count += 1;
        Ok(Progress {
            draw: self.draw_count,
            chain: self.settings.chain,
            num_draws: self.settings.num_draws,
        })
    }

    fn position(&self) -> Option<&SvarState> {
        self.state.as_ref()
    }
}
