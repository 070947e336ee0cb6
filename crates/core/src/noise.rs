use std::fmt;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::PixelArray;

/// Standard deviation of the whole-image Gaussian perturbation.
pub const GLOBAL_SIGMA: f32 = 0.5;
/// Standard deviation of the sparse perturbation at the positions it touches.
pub const SPARSE_SIGMA: f32 = 1.0;
/// Probability that a sample receives sparse noise.
pub const SPARSE_DENSITY: f32 = 0.1;

/// The fixed set of ways a candidate can be derived from the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// N(0, 0.5) on every sample.
    GlobalGaussian,
    /// U[-1, 1) scaled by `sample / 255` on every sample.
    SignalProportionalUniform,
    /// N(0, 1) on roughly one sample in ten.
    SparseLocalized,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::GlobalGaussian,
        Strategy::SignalProportionalUniform,
        Strategy::SparseLocalized,
    ];

    /// Pick a strategy uniformly at random.
    pub fn choose<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Noise to add to one sample of value `sample`.
    fn sample_noise<R: Rng>(self, sample: f32, rng: &mut R) -> f32 {
        match self {
            Strategy::GlobalGaussian => rng.sample::<f32, _>(StandardNormal) * GLOBAL_SIGMA,
            Strategy::SignalProportionalUniform => {
                rng.gen_range(-1.0f32..1.0) * (sample / 255.0)
            }
            Strategy::SparseLocalized => {
                let noise = rng.sample::<f32, _>(StandardNormal) * SPARSE_SIGMA;
                if rng.gen::<f32>() < SPARSE_DENSITY {
                    noise
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::GlobalGaussian => write!(f, "global-gaussian"),
            Strategy::SignalProportionalUniform => write!(f, "signal-proportional-uniform"),
            Strategy::SparseLocalized => write!(f, "sparse-localized"),
        }
    }
}

/// Apply `strategy` to a copy of `original`.
/// Each sample gets its noise in floating point, is clamped to [0, 255]
/// and truncated back to `u8`. The original is never modified.
pub fn perturb<R: Rng>(original: &PixelArray, strategy: Strategy, rng: &mut R) -> PixelArray {
    let samples = original
        .as_bytes()
        .iter()
        .map(|&v| {
            let sample = v as f32;
            (sample + strategy.sample_noise(sample, rng)).clamp(0.0, 255.0) as u8
        })
        .collect();
    original.with_samples(samples)
}

/// Produce one candidate: pick a strategy, then apply it.
pub fn generate_candidate<R: Rng>(original: &PixelArray, rng: &mut R) -> (Strategy, PixelArray) {
    let strategy = Strategy::choose(rng);
    (strategy, perturb(original, strategy, rng))
}
