//! Error types for the fingerprinting protocol.

use thiserror::Error;

/// Errors raised at the boundary of each protocol component.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FmapError {
    /// The dimension pool cannot supply `k` distinct indices for a subset.
    #[error("Insufficient pool: required {required} dimensions, available {available}")]
    InsufficientPool {
        /// Subset size `k`
        required: usize,
        /// Size of the dimension pool
        available: usize,
    },

    /// A vector, ID-set collection or distance matrix has the wrong size.
    #[error("Dimension mismatch: expected {expected}, actual {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Length actually provided
        actual: usize,
    },

    /// A construction parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what's wrong with the parameter
        message: String,
    },
}

impl FmapError {
    /// Create an InsufficientPool error.
    pub fn insufficient_pool(required: usize, available: usize) -> Self {
        Self::InsufficientPool {
            required,
            available,
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = FmapError::insufficient_pool(12, 3);
        assert_eq!(
            e.to_string(),
            "Insufficient pool: required 12 dimensions, available 3"
        );

        let e = FmapError::dimension_mismatch(128, 64);
        assert_eq!(e.to_string(), "Dimension mismatch: expected 128, actual 64");

        let e = FmapError::invalid_parameter("delta 200 exceeds d 128");
        assert_eq!(e.to_string(), "Invalid parameter: delta 200 exceeds d 128");
    }
}
