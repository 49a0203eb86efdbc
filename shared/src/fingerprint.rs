use std::collections::BTreeSet;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FmapError, Result};
use crate::sampler::Subset;
use crate::vector::BinaryVector;

/// One ID: the parity a vector produces on subset `subset_index`.
///
/// Two vectors collide on subset `l` iff their tags for `l` are equal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub subset_index: usize,
    pub parity: bool,
}

impl Tag {
    pub fn new(subset_index: usize, parity: bool) -> Self {
        Self {
            subset_index,
            parity,
        }
    }
}

impl fmt::Display for Tag {
    /// Renders as `l||p`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}||{}", self.subset_index, u8::from(self.parity))
    }
}

/// IDs of one vector, ordered by subset index.
pub type IdSet = BTreeSet<Tag>;

/// XOR of the vector's bits at the subset's indices; `false` for an empty subset.
#[inline]
pub fn subset_parity(vector: &BinaryVector, subset: &[usize]) -> bool {
    subset.iter().fold(false, |acc, &i| acc ^ vector.bit(i))
}

/// Number of tags two ID sets share.
pub fn intersection_size(a: &IdSet, b: &IdSet) -> usize {
    a.intersection(b).count()
}

/// Maps vectors of dimension `d` to ID sets over a fixed list of subsets.
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    d: usize,
    subsets: Vec<Subset>,
}

impl FingerprintEngine {
    pub fn new(d: usize, subsets: Vec<Subset>) -> Result<Self> {
        if let Some(&bad) = subsets.iter().flatten().find(|&&i| i >= d) {
            return Err(FmapError::invalid_parameter(format!(
                "subset index {} out of range for d {}",
                bad, d
            )));
        }
        Ok(Self { d, subsets })
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    /// Number of subsets, `L`.
    pub fn num_hashes(&self) -> usize {
        self.subsets.len()
    }

    pub fn compute_id(&self, vector: &BinaryVector) -> Result<IdSet> {
        self.check_len(vector)?;
        Ok(self.tags(vector))
    }

    /// One ID set per input vector, in input order. Every length is checked
    /// before any vector is processed.
    pub fn compute_id_batch(&self, vectors: &[BinaryVector]) -> Result<Vec<IdSet>> {
        for v in vectors {
            self.check_len(v)?;
        }
        debug!(
            vectors = vectors.len(),
            subsets = self.subsets.len(),
            "computing ID batch"
        );
        Ok(vectors.par_iter().map(|v| self.tags(v)).collect())
    }

    fn tags(&self, vector: &BinaryVector) -> IdSet {
        self.subsets
            .iter()
            .enumerate()
            .map(|(l, subset)| Tag::new(l, subset_parity(vector, subset)))
            .collect()
    }

    fn check_len(&self, vector: &BinaryVector) -> Result<()> {
        if vector.len() != self.d {
            return Err(FmapError::dimension_mismatch(self.d, vector.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::new(3, true).to_string(), "3||1");
        assert_eq!(Tag::new(17, false).to_string(), "17||0");
    }

    #[test]
    fn test_parity() {
        let v = BinaryVector::from_bytes(&[1, 0, 1, 1, 0, 0, 0, 1]);
        assert!(!subset_parity(&v, &[0, 2]));
        assert!(subset_parity(&v, &[0, 2, 3]));
        assert!(!subset_parity(&v, &[]));
        // order of indices is irrelevant
        assert_eq!(subset_parity(&v, &[7, 3, 0]), subset_parity(&v, &[0, 3, 7]));
    }

    #[test]
    fn test_compute_id_one_tag_per_subset() {
        let engine = FingerprintEngine::new(8, vec![vec![0, 1], vec![2, 3], vec![4, 5, 6]]).unwrap();
        let v = BinaryVector::from_bytes(&[1, 1, 1, 0, 0, 0, 1, 0]);
        let ids = engine.compute_id(&v).unwrap();
        let expected: IdSet = [Tag::new(0, false), Tag::new(1, true), Tag::new(2, true)]
            .into_iter()
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_compute_id_rejects_wrong_length() {
        let engine = FingerprintEngine::new(8, vec![vec![0, 1]]).unwrap();
        let v = BinaryVector::from_bytes(&[1, 0, 1]);
        assert_eq!(
            engine.compute_id(&v),
            Err(FmapError::dimension_mismatch(8, 3))
        );
    }

    #[test]
    fn test_batch_preserves_order_and_fails_whole() {
        let engine = FingerprintEngine::new(4, vec![vec![0], vec![1, 2], vec![3]]).unwrap();
        let vectors: Vec<BinaryVector> = (0u8..16)
            .map(|x| BinaryVector::from_bytes(&[x & 1, (x >> 1) & 1, (x >> 2) & 1, (x >> 3) & 1]))
            .collect();

        let batch = engine.compute_id_batch(&vectors).unwrap();
        assert_eq!(batch.len(), vectors.len());
        for (v, ids) in vectors.iter().zip(batch.iter()) {
            assert_eq!(ids, &engine.compute_id(v).unwrap());
        }

        let mut bad = vectors.clone();
        bad.push(BinaryVector::from_bytes(&[1, 0]));
        assert!(engine.compute_id_batch(&bad).is_err());
    }

    #[test]
    fn test_subset_index_out_of_range() {
        assert!(matches!(
            FingerprintEngine::new(4, vec![vec![0, 4]]),
            Err(FmapError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_intersection_size() {
        let a: IdSet = [Tag::new(0, true), Tag::new(1, false), Tag::new(2, true)]
            .into_iter()
            .collect();
        let b: IdSet = [Tag::new(0, true), Tag::new(1, true), Tag::new(2, true)]
            .into_iter()
            .collect();
        assert_eq!(intersection_size(&a, &b), 2);
        assert_eq!(intersection_size(&a, &a), 3);
    }
}
