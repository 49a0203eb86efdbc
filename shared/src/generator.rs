//! Synthetic sender/receiver data with stratified pairwise distances.
//!
//! Random pairs cluster around `d/2`, so receiver `i` is derived from sender
//! `i` with a flip count drawn from one of five bands around the threshold.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FmapError, Result};
use crate::vector::{BinaryVector, DistanceMatrix};

/// Flip-count band of a receiver index. Each band covers 20% of the indices.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceBand {
    /// `[0, delta/2)`
    WellWithin,
    /// `[delta/2, delta]`
    Within,
    /// `(delta, 1.5·delta]`
    JustBeyond,
    /// `(1.5·delta, 2·delta]`
    Beyond,
    /// `[0, d)`
    Uniform,
}

impl DistanceBand {
    pub const ALL: [DistanceBand; 5] = [
        DistanceBand::WellWithin,
        DistanceBand::Within,
        DistanceBand::JustBeyond,
        DistanceBand::Beyond,
        DistanceBand::Uniform,
    ];

    /// Band of index `i` out of `n`; splits at 20/40/60/80%.
    pub fn for_index(i: usize, n: usize) -> Self {
        let splits = [n / 5, n * 2 / 5, n * 3 / 5, n * 4 / 5];
        match splits.iter().position(|&s| i < s) {
            Some(0) => DistanceBand::WellWithin,
            Some(1) => DistanceBand::Within,
            Some(2) => DistanceBand::JustBeyond,
            Some(3) => DistanceBand::Beyond,
            _ => DistanceBand::Uniform,
        }
    }

    /// Inclusive flip-count bounds. An upper bound below the lower one collapses to the lower.
    pub fn flip_bounds(self, d: usize, delta: usize) -> (usize, usize) {
        let half = (delta / 2).max(1);
        let one_and_half = delta + delta / 2;
        let (lo, hi) = match self {
            DistanceBand::WellWithin => (0, half - 1),
            DistanceBand::Within => (half, delta),
            DistanceBand::JustBeyond => (delta + 1, one_and_half),
            DistanceBand::Beyond => (one_and_half + 1, 2 * delta),
            DistanceBand::Uniform => (0, d.saturating_sub(1)),
        };
        (lo, hi.max(lo))
    }
}

/// Sender vectors, receiver vectors and every pairwise distance between them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestData {
    pub senders: Vec<BinaryVector>,
    pub receivers: Vec<BinaryVector>,
    pub distances: DistanceMatrix,
}

#[derive(Debug, Clone, Copy)]
pub struct VectorPairGenerator {
    d: usize,
    delta: usize,
}

impl VectorPairGenerator {
    pub fn new(d: usize, delta: usize) -> Result<Self> {
        if d == 0 {
            return Err(FmapError::invalid_parameter("d must be positive"));
        }
        if delta > d {
            return Err(FmapError::invalid_parameter(format!(
                "delta {} exceeds d {}",
                delta, d
            )));
        }
        Ok(Self { d, delta })
    }

    /// `d` independent uniform bits.
    pub fn random_vector<R: Rng + ?Sized>(d: usize, rng: &mut R) -> BinaryVector {
        BinaryVector::new((0..d).map(|_| rng.gen::<bool>()).collect())
    }

    /// Number of flips for receiver `i` out of `n`, clamped to `d`.
    pub fn flip_count<R: Rng + ?Sized>(&self, i: usize, n: usize, rng: &mut R) -> usize {
        let (lo, hi) = DistanceBand::for_index(i, n).flip_bounds(self.d, self.delta);
        rng.gen_range(lo..=hi).min(self.d)
    }

    pub fn generate<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<TestData> {
        let senders: Vec<BinaryVector> = (0..n).map(|_| Self::random_vector(self.d, rng)).collect();

        let receivers: Vec<BinaryVector> = (0..n)
            .map(|i| {
                let base = &senders[i % n];
                let flips = self.flip_count(i, n, rng);
                let positions = index::sample(rng, self.d, flips).into_vec();
                base.with_flips(&positions)
            })
            .collect();

        let distances = DistanceMatrix::compute(&senders, &receivers)?;
        debug!(n, d = self.d, delta = self.delta, "generated stratified test data");

        Ok(TestData {
            senders,
            receivers,
            distances,
        })
    }
}
