use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed draw indices.
///
/// Every `rand::Rng` is a `RandomSource`; `gen_range` rejects and resamples
/// instead of reducing modulo the bound, so draws carry no index bias.
pub trait RandomSource {
    /// Returns an index uniformly distributed over `0..bound`. `bound` is never zero.
    fn next_index(&mut self, bound: usize) -> usize;
}

impl<R> RandomSource for R
where
    R: Rng + ?Sized,
{
    fn next_index(&mut self, bound: usize) -> usize {
        self.gen_range(0..bound)
    }
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn from_entropy() -> StdRng {
    StdRng::from_entropy()
}

/// Builds a generator from an optional configured seed.
pub fn from_seed_or_entropy(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => seeded(seed),
        None => from_entropy(),
    }
}
