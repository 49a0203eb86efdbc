//! High-entropy dimension selection.
//!
//! The per-dimension bias is simulated (drawn near 0.5) rather than estimated
//! from data. `EntropyDimensionSelector::select_from_entropies` accepts real
//! entropy estimates when they are available.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::{FmapError, Result};

/// Simulated bias is drawn from `[BIAS_CENTER - BIAS_SPREAD, BIAS_CENTER + BIAS_SPREAD]`.
pub const BIAS_CENTER: f64 = 0.5;
pub const BIAS_SPREAD: f64 = 0.1;

const BIAS_MIN: f64 = 0.01;
const BIAS_MAX: f64 = 0.99;

/// `H(p) = -p·log2(p) - (1-p)·log2(1-p)`, with `p` clamped to `[0.01, 0.99]`.
pub fn binary_entropy(p: f64) -> f64 {
    let p = p.clamp(BIAS_MIN, BIAS_MAX);
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// Distinct dimension indices treated as high-entropy.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DimensionPool {
    dims: Vec<usize>,
    fallback: bool,
}

impl DimensionPool {
    /// Repeated indices are dropped, the first occurrence keeps its position.
    pub fn new(dims: Vec<usize>) -> Self {
        let mut seen = HashSet::with_capacity(dims.len());
        Self {
            dims: dims.into_iter().filter(|&i| seen.insert(i)).collect(),
            fallback: false,
        }
    }

    /// Same as [`DimensionPool::new`], rejecting any index outside `0..d`.
    pub fn for_dimension(dims: Vec<usize>, d: usize) -> Result<Self> {
        if let Some(&bad) = dims.iter().find(|&&i| i >= d) {
            return Err(FmapError::invalid_parameter(format!(
                "pool index {} out of range for d {}",
                bad, d
            )));
        }
        Ok(Self::new(dims))
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn contains(&self, dim: usize) -> bool {
        self.dims.contains(&dim)
    }

    /// True when the threshold pool was too small and the entropy ranking was used instead.
    pub fn used_fallback(&self) -> bool {
        self.fallback
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntropyDimensionSelector {
    tau: f64,
}

impl EntropyDimensionSelector {
    pub fn new(tau: f64) -> Self {
        Self { tau }
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Draw one simulated entropy per dimension.
    pub fn simulate_entropies<R: Rng + ?Sized>(&self, d: usize, rng: &mut R) -> Vec<f64> {
        (0..d)
            .map(|_| {
                let p = rng.gen_range(BIAS_CENTER - BIAS_SPREAD..=BIAS_CENTER + BIAS_SPREAD);
                binary_entropy(p)
            })
            .collect()
    }

    /// Select the pool for `d` dimensions, subset size `k` and `num_hashes` subsets.
    pub fn select<R: Rng + ?Sized>(
        &self,
        d: usize,
        k: usize,
        num_hashes: usize,
        rng: &mut R,
    ) -> DimensionPool {
        let entropies = self.simulate_entropies(d, rng);
        self.select_from_entropies(&entropies, k, num_hashes)
    }

    /// Keep every dimension with entropy above `tau`. If fewer than `k` survive,
    /// take the `max(k·L, d)` highest-entropy dimensions instead, ties by index.
    pub fn select_from_entropies(
        &self,
        entropies: &[f64],
        k: usize,
        num_hashes: usize,
    ) -> DimensionPool {
        let dims: Vec<usize> = entropies
            .iter()
            .enumerate()
            .filter(|&(_, &h)| h > self.tau)
            .map(|(i, _)| i)
            .collect();

        if dims.len() >= k {
            return DimensionPool::new(dims);
        }

        debug!(
            natural = dims.len(),
            k, "entropy pool below subset size, ranking all dimensions"
        );

        let mut ranked: Vec<usize> = (0..entropies.len()).collect();
        // stable: equal entropies keep ascending index order
        ranked.sort_by(|&a, &b| entropies[b].total_cmp(&entropies[a]));
        ranked.truncate((k * num_hashes).max(entropies.len()));

        DimensionPool {
            dims: ranked,
            fallback: true,
        }
    }
}
