//! Conditional draws of the shrinkage hierarchy.

use faer::MatRef;
use rand::Rng;
use rand_distr::{ChiSquared, Distribution, Gamma};

use crate::error::{Component, NumericalFailure};
use crate::math::quadratic_form;
use crate::model::SvarModel;
use crate::state::Hyper;

fn failure(reason: impl Into<String>) -> NumericalFailure {
    NumericalFailure::new(Component::Hyperparameters, reason)
}

fn checked(name: &str, val: f64) -> Result<f64, NumericalFailure> {
    if val.is_finite() && val > 0f64 {
        Ok(val)
    } else {
        Err(failure(format!("{} draw is not positive: {}", name, val)))
    }
}

/// Draw from the inverted-gamma 2 distribution `IG2(scale, shape)`.
pub(crate) fn draw_ig2<R: Rng + ?Sized>(
    name: &str,
    scale: f64,
    shape: f64,
    rng: &mut R,
) -> Result<f64, NumericalFailure> {
    let chi = ChiSquared::new(shape)
        .map_err(|err| failure(format!("invalid shape {} for {}: {}", shape, name, err)))?;
    checked(name, scale / chi.sample(rng))
}

fn draw_gamma<R: Rng + ?Sized>(
    name: &str,
    shape: f64,
    scale: f64,
    rng: &mut R,
) -> Result<f64, NumericalFailure> {
    let gamma = Gamma::new(shape, scale).map_err(|err| {
        failure(format!(
            "invalid parameters shape {} scale {} for {}: {}",
            shape, scale, name, err
        ))
    })?;
    checked(name, gamma.sample(rng))
}

/// Redraw all five hyperparameters given the current `A` and `B`.
///
/// The level 3 scale is drawn first, then the level 2 scales and finally the
/// overall shrinkage of `A` and `B`, each conditional on the draws before it.
pub(crate) fn sample_hyperparameters<R: Rng + ?Sized>(
    model: &SvarModel,
    a: MatRef<'_, f64>,
    b: MatRef<'_, f64>,
    hyper: &mut Hyper,
    rng: &mut R,
) -> Result<(), NumericalFailure> {
    let prior = model.prior();
    let dims = model.dims();

    hyper.s_gamma = draw_ig2(
        "s_gamma",
        prior.hyper_s + 2. * (hyper.s_a + hyper.s_b),
        prior.hyper_v + 4. * prior.hyper_a,
        rng,
    )?;

    let shape = prior.hyper_a + prior.hyper_nu / 2.;
    hyper.s_a = draw_gamma(
        "s_A",
        shape,
        (1. / hyper.s_gamma + 1. / (2. * hyper.gamma_a)).recip(),
        rng,
    )?;
    hyper.s_b = draw_gamma(
        "s_B",
        shape,
        (1. / hyper.s_gamma + 1. / (2. * hyper.gamma_b)).recip(),
        rng,
    )?;

    let a_v_inv = prior.a_v_inv.as_ref();
    let a_quad: f64 = (0..dims.n)
        .map(|row| {
            let diff: Vec<f64> = (0..dims.k)
                .map(|j| a[(row, j)] - prior.a[(row, j)])
                .collect();
            quadratic_form(a_v_inv, &diff)
        })
        .sum();
    hyper.gamma_a = draw_ig2(
        "gamma_A",
        hyper.s_a + a_quad,
        prior.hyper_nu + (dims.n * dims.k) as f64,
        rng,
    )?;

    let b_v_inv = prior.b_v_inv.as_ref();
    let b_quad: f64 = (0..dims.n)
        .map(|col| {
            let column: Vec<f64> = (0..dims.n).map(|i| b[(i, col)]).collect();
            quadratic_form(b_v_inv, &column)
        })
        .sum();
    let free = model.restrictions().free_counts().sum::<usize>() as f64;
    hyper.gamma_b = draw_ig2(
        "gamma_B",
        hyper.s_b + b_quad,
        prior.hyper_nu + free,
        rng,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::data::test_data;
    use crate::{Prior, Restrictions};

    fn model() -> SvarModel {
        let data = test_data::simulate(&test_data::true_a(), &test_data::true_b(), 60, 9);
        SvarModel::new(data, Prior::minnesota(2, 1, 1), Restrictions::lower_triangular(2))
            .unwrap()
    }

    #[test]
    fn ig2_mean() {
        // E[s / χ²_ν] = s / (ν − 2)
        let mut rng = StdRng::seed_from_u64(11);
        let draws = 50_000;
        let mean = (0..draws)
            .map(|_| draw_ig2("test", 6., 10., &mut rng).unwrap())
            .sum::<f64>()
            / draws as f64;
        assert_abs_diff_eq!(mean, 0.75, epsilon = 0.02);
    }

    #[test]
    fn invalid_shape_is_numerical_failure() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = draw_ig2("test", 1., -2., &mut rng).unwrap_err();
        assert_eq!(err.component, Component::Hyperparameters);
    }

    #[test]
    fn negative_scale_is_numerical_failure() {
        let model = model();
        let a = test_data::true_a();
        let b = test_data::true_b();
        let mut hyper = Hyper {
            s_a: -10.,
            ..Hyper::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let err = sample_hyperparameters(&model, a.as_ref(), b.as_ref(), &mut hyper, &mut rng)
            .unwrap_err();
        assert_eq!(err.component, Component::Hyperparameters);
    }

    #[test]
    fn gamma_a_tracks_prior_distance() {
        // A far from the prior mean pushes the overall shrinkage of A up.
        // `near` stays off the prior mean: with A pinned exactly at it the
        // (γ_A, s_A) conditional is improper near zero.
        let model = model();
        let b = test_data::true_b();
        let near = faer::Mat::from_fn(2, 3, |i, j| model.prior().a[(i, j)] + 0.2);
        let far = faer::Mat::from_fn(2, 3, |i, j| model.prior().a[(i, j)] + 5.);
        let mut rng = StdRng::seed_from_u64(8);
        let mut mean = |a: &faer::Mat<f64>| {
            let mut hyper = Hyper::default();
            let mut sum = 0f64;
            for _ in 0..2000 {
                sample_hyperparameters(&model, a.as_ref(), b.as_ref(), &mut hyper, &mut rng)
                    .unwrap();
                sum += hyper.gamma_a;
            }
            sum / 2000.
        };
        let near_mean = mean(&near);
        let far_mean = mean(&far);
        assert!(far_mean > 5. * near_mean);
    }

    proptest! {
        #[test]
        fn draws_stay_positive(
            start in prop::collection::vec(1e-3f64..1e3, 5),
            shift in -10f64..10f64,
            seed in any::<u64>(),
        ) {
            let model = model();
            let a = faer::Mat::from_fn(2, 3, |i, j| test_data::true_a()[(i, j)] + shift);
            let b = test_data::true_b();
            let mut hyper = Hyper::from_slice(&start).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..5 {
                sample_hyperparameters(&model, a.as_ref(), b.as_ref(), &mut hyper, &mut rng).unwrap();
                prop_assert!(hyper.all_positive());
            }
        }
    }
}
