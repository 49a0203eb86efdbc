//! Confusion-matrix accounting of ID-set intersection against true distance.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FmapError, Result};
use crate::fingerprint::{intersection_size, IdSet};
use crate::params::{check_dimensions, subset_size};
use crate::vector::DistanceMatrix;

/// Close pairs are `dist <= delta`, far pairs are `dist > delta`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionCounters {
    pub true_positive: u64,
    pub false_negative: u64,
    pub true_negative: u64,
    pub false_positive: u64,
}

impl ConfusionCounters {
    /// Account one pair.
    pub fn record(&mut self, close: bool, has_intersection: bool) {
        match (close, has_intersection) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_negative += 1,
            (false, false) => self.true_negative += 1,
            (false, true) => self.false_positive += 1,
        }
    }

    pub fn total_close(&self) -> u64 {
        self.true_positive + self.false_negative
    }

    pub fn total_far(&self) -> u64 {
        self.true_negative + self.false_positive
    }

    pub fn total(&self) -> u64 {
        self.total_close() + self.total_far()
    }

    /// TP / close pairs; 0 when there are none.
    pub fn detection_rate(&self) -> f64 {
        ratio(self.true_positive, self.total_close())
    }

    pub fn miss_rate(&self) -> f64 {
        ratio(self.false_negative, self.total_close())
    }

    /// TN / far pairs; 0 when there are none.
    pub fn rejection_rate(&self) -> f64 {
        ratio(self.true_negative, self.total_far())
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.false_positive, self.total_far())
    }
}

impl Add for ConfusionCounters {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            true_positive: self.true_positive + other.true_positive,
            false_negative: self.false_negative + other.false_negative,
            true_negative: self.true_negative + other.true_negative,
            false_positive: self.false_positive + other.false_positive,
        }
    }
}

impl AddAssign for ConfusionCounters {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    num as f64 / den.max(1) as f64
}

/// Outcome for one (sender, receiver) pair.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRecord {
    pub sender_idx: usize,
    pub receiver_idx: usize,
    pub hamming_distance: usize,
    pub has_intersection: bool,
    pub intersection_size: usize,
}

/// Closed-form collision probabilities at distance `delta`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TheoreticalPrediction {
    /// `delta / d`
    pub rho: f64,
    pub k: usize,
    /// One subset agrees: `(1 + (1 - 2·rho)^k) / 2`
    pub p_single: f64,
    /// At least one of `L` subsets agrees: `1 - (1 - p_single)^L`
    pub p_collision: f64,
}

impl TheoreticalPrediction {
    pub fn compute(d: usize, delta: usize, num_hashes: usize) -> Result<Self> {
        check_dimensions(d, delta, num_hashes)?;
        let rho = delta as f64 / d as f64;
        let k = subset_size(d, delta);
        let p_single = (1.0 + (1.0 - 2.0 * rho).powi(k as i32)) / 2.0;
        let p_collision = 1.0 - (1.0 - p_single).powi(num_hashes as i32);
        Ok(Self {
            rho,
            k,
            p_single,
            p_collision,
        })
    }
}

/// Detected / total pairs with distance in `[lo, hi)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandRate {
    pub lo: usize,
    pub hi: usize,
    pub detected: usize,
    pub total: usize,
}

impl BandRate {
    pub fn rate(&self) -> f64 {
        self.detected as f64 / self.total.max(1) as f64
    }
}

/// Detected / total pairs at exactly one distance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionPoint {
    pub distance: usize,
    pub detected: usize,
    pub total: usize,
}

impl DetectionPoint {
    pub fn rate(&self) -> f64 {
        self.detected as f64 / self.total.max(1) as f64
    }
}

/// Result of one evaluation pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub delta: usize,
    pub counters: ConfusionCounters,
    pub theory: TheoreticalPrediction,
    /// Row-major: sender 0 against every receiver, then sender 1, ...
    pub records: Vec<PairRecord>,
}

impl Evaluation {
    /// Detection over pairs with distance in `[lo, hi)`. `None` if no pair falls in range.
    pub fn band_rate(&self, lo: usize, hi: usize) -> Option<BandRate> {
        let (detected, total) = self
            .records
            .iter()
            .filter(|r| r.hamming_distance >= lo && r.hamming_distance < hi)
            .fold((0, 0), |(det, tot), r| {
                (det + usize::from(r.has_intersection), tot + 1)
            });
        (total > 0).then_some(BandRate {
            lo,
            hi,
            detected,
            total,
        })
    }

    /// Rates over `[0, δ/2)`, `[δ/2, δ)`, `[δ, 2δ)` and `[2δ, d)`, skipping empty ranges.
    pub fn distance_bands(&self, d: usize) -> Vec<BandRate> {
        let delta = self.delta;
        [
            (0, delta / 2),
            (delta / 2, delta),
            (delta, delta * 2),
            (delta * 2, d),
        ]
        .into_iter()
        .filter_map(|(lo, hi)| self.band_rate(lo, hi))
        .collect()
    }

    /// Detection rate at every distance that occurs, ascending.
    pub fn detection_curve(&self) -> Vec<DetectionPoint> {
        let mut by_distance: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
        for r in &self.records {
            let entry = by_distance.entry(r.hamming_distance).or_default();
            entry.0 += usize::from(r.has_intersection);
            entry.1 += 1;
        }
        by_distance
            .into_iter()
            .map(|(distance, (detected, total))| DetectionPoint {
                distance,
                detected,
                total,
            })
            .collect()
    }

    /// Distances of close (`<= delta`) or far pairs, in record order.
    pub fn distances(&self, close: bool) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| (r.hamming_distance <= self.delta) == close)
            .map(|r| r.hamming_distance)
            .collect()
    }
}

/// Compares ID-set intersection against ground-truth distance for every pair.
#[derive(Debug, Clone, Copy)]
pub struct MatchEvaluator {
    delta: usize,
    theory: TheoreticalPrediction,
}

impl MatchEvaluator {
    pub fn new(d: usize, delta: usize, num_hashes: usize) -> Result<Self> {
        Ok(Self {
            delta,
            theory: TheoreticalPrediction::compute(d, delta, num_hashes)?,
        })
    }

    pub fn theory(&self) -> TheoreticalPrediction {
        self.theory
    }

    /// Evaluate the full `n × n` cross product. Rows are split across worker
    /// threads and their counters merged at the end.
    pub fn evaluate(
        &self,
        sender_ids: &[IdSet],
        receiver_ids: &[IdSet],
        distances: &DistanceMatrix,
    ) -> Result<Evaluation> {
        let n = sender_ids.len();
        if receiver_ids.len() != n {
            return Err(FmapError::dimension_mismatch(n, receiver_ids.len()));
        }
        if distances.size() != n {
            return Err(FmapError::dimension_mismatch(n, distances.size()));
        }

        let rows: Vec<(ConfusionCounters, Vec<PairRecord>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut counters = ConfusionCounters::default();
                let mut records = Vec::with_capacity(n);
                for j in 0..n {
                    let dist = distances.get(i, j);
                    let shared = intersection_size(&sender_ids[i], &receiver_ids[j]);
                    let has_intersection = shared > 0;
                    counters.record(dist <= self.delta, has_intersection);
                    records.push(PairRecord {
                        sender_idx: i,
                        receiver_idx: j,
                        hamming_distance: dist,
                        has_intersection,
                        intersection_size: shared,
                    });
                }
                (counters, records)
            })
            .collect();

        let mut counters = ConfusionCounters::default();
        let mut records = Vec::with_capacity(n * n);
        for (row_counters, row_records) in rows {
            counters += row_counters;
            records.extend(row_records);
        }

        debug!(
            pairs = counters.total(),
            close = counters.total_close(),
            far = counters.total_far(),
            "evaluation complete"
        );

        Ok(Evaluation {
            delta: self.delta,
            counters,
            theory: self.theory,
            records,
        })
    }
}
