use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::entropy::DimensionPool;
use crate::error::{FmapError, Result};

/// `k` distinct dimension indices read by one hash function.
pub type Subset = Vec<usize>;

/// Draws the `L` public index subsets.
pub struct SubsetSampler;

impl SubsetSampler {
    /// Seed one generator and draw all `num_hashes` subsets from it in sequence.
    pub fn generate(
        pool: &DimensionPool,
        k: usize,
        num_hashes: usize,
        seed: u64,
    ) -> Result<Vec<Subset>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::generate_with(pool, k, num_hashes, &mut rng)
    }

    /// Same as [`SubsetSampler::generate`] but consumes a caller-owned generator.
    /// `k` and `num_hashes` must be positive.
    pub fn generate_with<R: Rng + ?Sized>(
        pool: &DimensionPool,
        k: usize,
        num_hashes: usize,
        rng: &mut R,
    ) -> Result<Vec<Subset>> {
        if k == 0 {
            return Err(FmapError::invalid_parameter("subset size k must be positive"));
        }
        if num_hashes == 0 {
            return Err(FmapError::invalid_parameter("L must be positive"));
        }
        // pool members are distinct, so len() counts distinct indices
        if pool.len() < k {
            return Err(FmapError::insufficient_pool(k, pool.len()));
        }

        Ok((0..num_hashes)
            .map(|_| pool.dims().choose_multiple(rng, k).copied().collect())
            .collect())
    }
}
