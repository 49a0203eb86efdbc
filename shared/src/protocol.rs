use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::entropy::{DimensionPool, EntropyDimensionSelector};
use crate::error::Result;
use crate::evaluator::{MatchEvaluator, TheoreticalPrediction};
use crate::fingerprint::{FingerprintEngine, IdSet};
use crate::params::ProtocolParams;
use crate::sampler::{SubsetSampler, Subset};
use crate::vector::BinaryVector;

/// One E-LSH Fmap instance: the dimension pool and the `L` public subsets
/// both parties fingerprint with. Read-only after construction.
#[derive(Debug, Clone)]
pub struct ElshFmap {
    params: ProtocolParams,
    k: usize,
    pool: DimensionPool,
    engine: FingerprintEngine,
    evaluator: MatchEvaluator,
}

/// ChaCha stream of the subset draws. The entropy draws use stream 0.
const SUBSET_STREAM: u64 = 1;

impl ElshFmap {
    /// Build with the entropy draws and the subset draws on two distinct
    /// streams of a generator seeded from `params.seed`.
    pub fn new(params: ProtocolParams) -> Result<Self> {
        let mut entropy_rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut subset_rng = ChaCha8Rng::seed_from_u64(params.seed);
        subset_rng.set_stream(SUBSET_STREAM);
        Self::with_rngs(params, &mut entropy_rng, &mut subset_rng)
    }

    pub fn with_rngs<E, S>(params: ProtocolParams, entropy_rng: &mut E, subset_rng: &mut S) -> Result<Self>
    where
        E: Rng + ?Sized,
        S: Rng + ?Sized,
    {
        params.validate()?;
        let k = params.subset_size();

        let pool = EntropyDimensionSelector::new(params.tau).select(
            params.d,
            k,
            params.num_hashes,
            entropy_rng,
        );
        let subsets = SubsetSampler::generate_with(&pool, k, params.num_hashes, subset_rng)?;
        let engine = FingerprintEngine::new(params.d, subsets)?;
        let evaluator = MatchEvaluator::new(params.d, params.delta, params.num_hashes)?;

        info!(
            d = params.d,
            delta = params.delta,
            k,
            L = params.num_hashes,
            pool = pool.len(),
            fallback = pool.used_fallback(),
            "E-LSH parameters"
        );

        Ok(Self {
            params,
            k,
            pool,
            engine,
            evaluator,
        })
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Subset size `k`.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn pool(&self) -> &DimensionPool {
        &self.pool
    }

    pub fn subsets(&self) -> &[Subset] {
        self.engine.subsets()
    }

    pub fn engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    pub fn compute_id(&self, vector: &BinaryVector) -> Result<IdSet> {
        self.engine.compute_id(vector)
    }

    pub fn compute_id_batch(&self, vectors: &[BinaryVector]) -> Result<Vec<IdSet>> {
        self.engine.compute_id_batch(vectors)
    }

    /// Evaluator configured with this instance's `d`, `delta` and `L`.
    pub fn evaluator(&self) -> MatchEvaluator {
        self.evaluator
    }

    pub fn theory(&self) -> TheoreticalPrediction {
        self.evaluator.theory()
    }
}
