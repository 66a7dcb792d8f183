//! Complex Gaussian increments for state diffusion

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::f64::consts::FRAC_1_SQRT_2;

/// A source of standard complex Gaussian samples
///
/// Each draw has independent real and imaginary parts of standard
/// deviation 1/√2, so `E[|ξ|²] = 1`, the normalization the diffusion
/// increments assume.
pub struct ComplexNormal {
    rng: StdRng,
}

impl ComplexNormal {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Seeded source, for reproducible trajectories
    pub fn seed_from_u64(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Entropy-seeded source
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// One complex Gaussian draw
    pub fn sample(&mut self) -> Complex64 {
        let re: f64 = self.rng.sample(StandardNormal);
        let im: f64 = self.rng.sample(StandardNormal);
        Complex64::new(re * FRAC_1_SQRT_2, im * FRAC_1_SQRT_2)
    }
}
