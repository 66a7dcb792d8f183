//! Error types for state vector operations

use thiserror::Error;

/// Errors that can occur during state construction and measurement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Basis index outside the product space
    #[error("Basis index {basis} out of range for total dimension {total}")]
    BasisOutOfRange { basis: usize, total: usize },

    /// A freedom (tensor factor) has dimension zero
    #[error("Freedom {index} has dimension 0")]
    ZeroDimension { index: usize },

    /// Freedom index outside the state's tensor factors
    #[error("Freedom index {index} out of range for {n_freedoms}-freedom state")]
    FreedomOutOfRange { index: usize, n_freedoms: usize },

    /// Product-state factor is not a valid single-freedom state
    #[error("Product factor {index} must be a single-freedom state of dimension >= 2")]
    InvalidProductFactor { index: usize },

    /// Raw buffer length does not match the shape
    #[error("Buffer length {actual} does not match total dimension {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// Qubit-only measurement on a non-qubit freedom
    #[error("Freedom {index} has dimension {dim}, expected a qubit (dimension 2)")]
    NotAQubit { index: usize, dim: usize },
}

/// Result type for state vector operations
pub type Result<T> = std::result::Result<T, StateError>;
