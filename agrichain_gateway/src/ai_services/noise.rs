use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the uniform noise term used by the estimators
pub trait NoiseSource {
    /// A value in `[low, high]`
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// Noise drawn from a real RNG
#[derive(Debug, Clone)]
pub struct RandomNoise<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomNoise<StdRng> {
    /// Entropy-seeded noise; `Send`, so it may live across awaits
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NoiseSource for RandomNoise<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..=high)
    }
}

/// Pinned noise for tests: always the point at `position` (0.0 = low,
/// 1.0 = high) of the requested range
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise {
    position: f64,
}

impl FixedNoise {
    pub fn at(position: f64) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
        }
    }

    pub fn low() -> Self {
        Self::at(0.0)
    }

    pub fn midpoint() -> Self {
        Self::at(0.5)
    }

    pub fn high() -> Self {
        Self::at(1.0)
    }
}

impl NoiseSource for FixedNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.position
    }
}
