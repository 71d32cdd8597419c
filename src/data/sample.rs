//! Synthetic rod temperature measurements.
//!
//! Measurements are the model evaluated at thermocouple positions plus
//! Gaussian noise, one run per requested repetition. Generation is seeded so
//! the same inputs always give the same sample.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Measurement;
use crate::error::{AppError, EXIT_INPUT, EXIT_NUMERIC};
use crate::models::Model;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    /// True free parameter values, in the model's free parameter order.
    pub truth: Vec<f64>,
    /// (m) Thermocouple positions.
    pub x: Vec<f64>,
    /// (C) Standard deviation of the measurement noise.
    pub noise: f64,
    pub runs: usize,
    pub seed: u64,
}

pub fn generate_sample(model: &Model, spec: &SampleSpec) -> Result<Vec<Measurement>, AppError> {
    if spec.runs == 0 || spec.x.is_empty() {
        return Err(AppError::new(EXIT_INPUT, "Sample needs at least one run and one position."));
    }
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::new(EXIT_INPUT, "Sample noise must be finite and non-negative."));
    }

    let clean = model.eval_many(&spec.x, &spec.truth)?;
    if clean.iter().any(|y| !y.is_finite()) {
        return Err(AppError::new(EXIT_NUMERIC, "Model is not finite at every sample position."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(spec));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(EXIT_NUMERIC, format!("Noise distribution error: {e}")))?;
    let y_err = (spec.noise > 0.0).then_some(spec.noise);

    let mut out = Vec::with_capacity(spec.runs * spec.x.len());
    for run in 0..spec.runs {
        let name = format!("sample-{:03}", run + 1);
        for (&x, &y) in spec.x.iter().zip(&clean) {
            let z: f64 = normal.sample(&mut rng);
            out.push(Measurement {
                run: name.clone(),
                x,
                y: y + spec.noise * z,
                y_err,
            });
        }
    }
    Ok(out)
}

fn sample_seed(spec: &SampleSpec) -> u64 {
    let mut hasher = DefaultHasher::new();
    spec.seed.hash(&mut hasher);
    for v in spec.truth.iter().chain(&spec.x) {
        v.to_bits().hash(&mut hasher);
    }
    spec.noise.to_bits().hash(&mut hasher);
    spec.runs.hash(&mut hasher);
    hasher.finish()
}
