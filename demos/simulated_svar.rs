//! Simulate a bivariate SVAR, sample its posterior and print summaries.
//!
//! An optional first argument names a JSON file with `GibbsSettings`.

use std::time::Instant;

use anyhow::{Context, Result};
use bsvar_rs::{
    normalise_wz2003, sample, FnHooks, GibbsSettings, Normalisation, Prior, Progress,
    Restrictions, SvarData, SvarModel, SvarState,
};
use faer::Mat;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

fn simulate(periods: usize) -> Result<SvarData> {
    let a = [[0.5, 0.0, 0.1], [0.2, 0.3, -0.1]];
    // B⁻ᵀ for B = [[1, 0], [0.5, 1]]
    let impact = [[1.0, -0.5], [0.0, 1.0]];
    let mut rng = StdRng::seed_from_u64(2024);
    let mut series = Mat::<f64>::zeros(periods + 1, 2);
    for s in 1..=periods {
        let u: [f64; 2] = [StandardNormal.sample(&mut rng), StandardNormal.sample(&mut rng)];
        for i in 0..2 {
            let mut val = a[i][2];
            for j in 0..2 {
                val += a[i][j] * series[(s - 1, j)] + impact[i][j] * u[j];
            }
            series[(s, i)] = val;
        }
    }
    Ok(SvarData::from_series(series.as_ref(), 1, true)?)
}

fn main() -> Result<()> {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read settings from {}", path))?;
            serde_json::from_str(&text).context("invalid settings file")?
        }
        None => GibbsSettings {
            num_draws: 2000,
            normalisation: Normalisation::PositiveDiagonal,
            ..GibbsSettings::default()
        },
    };

    let model = SvarModel::new(
        simulate(300)?,
        Prior::minnesota(2, 1, 1),
        Restrictions::lower_triangular(2),
    )?;
    let start = SvarState::initial(&model);

    let begin = Instant::now();
    let mut hooks = FnHooks {
        progress: |progress: &Progress| {
            println!("{:>6} / {}", progress.draw, progress.num_draws);
        },
        cancel: || false,
    };
    let mut output = sample(&model, &start, &settings, &mut hooks)?;
    println!("sampling took {:?}", begin.elapsed());

    output.posterior.discard(output.posterior.len() / 5);
    normalise_wz2003(&mut output.posterior, output.last_draw.b.as_ref())?;

    let mean_a = output.posterior.mean_a().context("no draws")?;
    let mean_b = output.posterior.mean_b().context("no draws")?;
    println!("posterior mean of A:\n{:?}", mean_a);
    println!("posterior mean of B:\n{:?}", mean_b);

    let hyper = output.posterior.hyper_matrix();
    let names = ["gamma_A", "gamma_B", "s_A", "s_B", "s_gamma"];
    for (i, name) in names.iter().enumerate() {
        let mean = (0..hyper.ncols()).map(|s| hyper[(i, s)]).sum::<f64>() / hyper.ncols() as f64;
        println!("{:>8}: {:.4}", name, mean);
    }
    Ok(())
}
