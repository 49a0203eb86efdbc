use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FmapError, Result};

/// Fixed-length binary vector, one `bool` per dimension.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryVector {
    bits: Vec<bool>,
}

impl BinaryVector {
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Build from 0/1 bytes; any non-zero byte is a 1.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().map(|&b| b != 0).collect())
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn bit(&self, i: usize) -> bool {
        self.bits[i]
    }

    /// Bitwise NOT of every dimension.
    pub fn complement(&self) -> Self {
        Self::new(self.bits.iter().map(|b| !b).collect())
    }

    /// Copy with the given positions flipped. Positions are expected to be distinct.
    pub fn with_flips(&self, positions: &[usize]) -> Self {
        let mut bits = self.bits.clone();
        for &p in positions {
            bits[p] = !bits[p];
        }
        Self::new(bits)
    }

    /// Space-separated 0/1 rendering.
    pub fn to_bit_string(&self) -> String {
        self.bits
            .iter()
            .map(|&b| if b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<bool>> for BinaryVector {
    fn from(bits: Vec<bool>) -> Self {
        Self::new(bits)
    }
}

/// Number of dimensions where `a` and `b` differ.
pub fn hamming_distance(a: &BinaryVector, b: &BinaryVector) -> Result<usize> {
    if a.len() != b.len() {
        return Err(FmapError::dimension_mismatch(a.len(), b.len()));
    }
    Ok(a.bits
        .iter()
        .zip(b.bits.iter())
        .filter(|(x, y)| x != y)
        .count())
}

/// Square matrix of Hamming distances. Row `i` is sender `i`, column `j` is receiver `j`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    n: usize,
    cells: Vec<usize>,
}

impl DistanceMatrix {
    /// Distances for the full cross product of `senders` × `receivers`.
    pub fn compute(senders: &[BinaryVector], receivers: &[BinaryVector]) -> Result<Self> {
        if senders.len() != receivers.len() {
            return Err(FmapError::dimension_mismatch(senders.len(), receivers.len()));
        }
        let n = senders.len();

        let rows: Vec<Vec<usize>> = senders
            .par_iter()
            .map(|q| {
                receivers
                    .iter()
                    .map(|w| hamming_distance(q, w))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            n,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Build from explicit rows; every row must have as many entries as there are rows.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self> {
        let n = rows.len();
        let mut cells = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(FmapError::dimension_mismatch(n, row.len()));
            }
            cells.extend(row);
        }
        Ok(Self { n, cells })
    }

    /// Number of rows (= number of columns).
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> usize {
        self.cells[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.cells[i * self.n..(i + 1) * self.n]
    }

    /// Distances of the aligned pairs (sender `i`, receiver `i`).
    pub fn diagonal(&self) -> Vec<usize> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }
}
