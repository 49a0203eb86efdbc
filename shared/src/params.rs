use serde::{Deserialize, Serialize};

use crate::error::{FmapError, Result};

/// Construction parameters of one protocol instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ProtocolParams {
    /// Vector dimension
    pub d: usize,

    /// Hamming distance threshold
    pub delta: usize,

    /// Number of subsets (hash functions), `L`
    #[serde(alias = "L")]
    pub num_hashes: usize,

    /// Entropy threshold, strictly inside (0, 1)
    pub tau: f64,

    /// Seed of the public randomness shared by both parties
    pub seed: u64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            d: 128,
            delta: 10,
            num_hashes: 32,
            tau: 0.5,
            seed: 42,
        }
    }
}

impl ProtocolParams {
    pub fn new(d: usize, delta: usize, num_hashes: usize) -> Self {
        Self {
            d,
            delta,
            num_hashes,
            ..Self::default()
        }
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Subset size `k = ceil(d / (delta + 1))`.
    pub fn subset_size(&self) -> usize {
        subset_size(self.d, self.delta)
    }

    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.d, self.delta, self.num_hashes)?;
        // NaN fails both comparisons
        if !(self.tau > 0.0 && self.tau < 1.0) {
            return Err(FmapError::invalid_parameter(format!(
                "tau {} outside (0, 1)",
                self.tau
            )));
        }
        Ok(())
    }
}

/// Shared by every component that takes `d`, `delta` and `L` directly.
pub fn check_dimensions(d: usize, delta: usize, num_hashes: usize) -> Result<()> {
    if d == 0 {
        return Err(FmapError::invalid_parameter("d must be positive"));
    }
    if delta > d {
        return Err(FmapError::invalid_parameter(format!(
            "delta {} exceeds d {}",
            delta, d
        )));
    }
    if num_hashes == 0 {
        return Err(FmapError::invalid_parameter("L must be positive"));
    }
    Ok(())
}

/// `ceil(d / (delta + 1))`
pub fn subset_size(d: usize, delta: usize) -> usize {
    d.div_ceil(delta + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_size() {
        assert_eq!(subset_size(128, 10), 12);
        assert_eq!(subset_size(128, 0), 128);
        assert_eq!(subset_size(128, 128), 1);
        assert_eq!(subset_size(8, 1), 4);
        assert_eq!(subset_size(9, 1), 5);
    }

    #[test]
    fn test_defaults_are_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.subset_size(), 12);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(matches!(
            ProtocolParams::new(0, 0, 4).validate(),
            Err(FmapError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ProtocolParams::new(16, 17, 4).validate(),
            Err(FmapError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ProtocolParams::new(16, 2, 0).validate(),
            Err(FmapError::InvalidParameter { .. })
        ));
        for tau in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(
                ProtocolParams::new(16, 2, 4).with_tau(tau).validate().is_err(),
                "tau {} should be rejected",
                tau
            );
        }
        // delta == d is allowed
        assert!(ProtocolParams::new(16, 16, 4).validate().is_ok());
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(8, 8, 1).is_ok());
        assert!(check_dimensions(0, 0, 1).is_err());
        assert!(check_dimensions(8, 20, 1).is_err());
        assert!(check_dimensions(8, 2, 0).is_err());
    }

    #[test]
    fn test_params_from_json_accepts_l_alias() {
        let params: ProtocolParams =
            serde_json::from_str(r#"{"d": 64, "delta": 4, "L": 8}"#).unwrap();
        assert_eq!(params.d, 64);
        assert_eq!(params.delta, 4);
        assert_eq!(params.num_hashes, 8);
        assert_eq!(params.tau, 0.5);
        assert_eq!(params.seed, 42);
    }
}
