use std::sync::Mutex;

use rand::{rngs::StdRng, Rng, SeedableRng};

/// A source of uniformly distributed integers.
///
/// The simulated oracle never touches process-wide random state. It draws from whatever source it was constructed
/// with, which lets tests supply seeded or fully scripted sequences.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `0..upper`. Returns 0 when `upper` is 0.
    fn below(&self, upper: u32) -> u32;
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// A reproducible generator. Two instances with the same seed produce the same sequence.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl RandomSource for SeededRandom {
    fn below(&self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        // A poisoned lock still holds a usable generator
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..upper)
    }
}
