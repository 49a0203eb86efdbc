//! Entropy-aware LSH fingerprinting (E-LSH Fmap) for approximate matching of
//! binary vectors under Hamming distance.
//!
//! Each vector is reduced to `L` tags, one per public index subset, carrying
//! the parity of the vector's bits on that subset. Vectors within distance
//! `delta` share a tag with high probability.

pub mod entropy;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod generator;
pub mod params;
pub mod protocol;
pub mod sampler;
pub mod vector;

// Re-exports
pub use entropy::{binary_entropy, DimensionPool, EntropyDimensionSelector};
pub use error::{FmapError, Result};
pub use evaluator::{
    BandRate, ConfusionCounters, DetectionPoint, Evaluation, MatchEvaluator, PairRecord,
    TheoreticalPrediction,
};
pub use fingerprint::{intersection_size, subset_parity, FingerprintEngine, IdSet, Tag};
pub use generator::{DistanceBand, TestData, VectorPairGenerator};
pub use params::{check_dimensions, subset_size, ProtocolParams};
pub use protocol::ElshFmap;
pub use sampler::{Subset, SubsetSampler};
pub use vector::{hamming_distance, BinaryVector, DistanceMatrix};
