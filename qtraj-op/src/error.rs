//! Error types for operator construction and application

use thiserror::Error;

/// Errors that can occur when building or applying operators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    /// Operator addressed a freedom the state does not have
    #[error("Freedom index {index} out of range for {n_freedoms}-freedom state")]
    FreedomOutOfRange { index: usize, n_freedoms: usize },

    /// Two-freedom operator addressed the same freedom twice
    #[error("Two-freedom operator needs distinct freedoms, got {index} twice")]
    DuplicateFreedom { index: usize },

    /// Operator dimension does not match the state dimension
    #[error("Operator of dimension {op_dim} applied to state of dimension {state_dim}")]
    ShapeMismatch { op_dim: usize, state_dim: usize },

    /// Operator matrix is not square where a square one is required
    #[error("Expected a square matrix, got {rows} x {cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Incompatible matrix shapes in an algebraic combination
    #[error("Matrix shape mismatch: {a_rows} x {a_cols} vs {b_rows} x {b_cols}")]
    MatrixShape {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    /// Matrix entry outside the declared shape
    #[error("Entry ({row}, {col}) outside a {rows} x {cols} matrix")]
    EntryOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// `embed` received mismatched operator and target lists
    #[error("embed: {ops} operators for {targets} targets")]
    EmbedArity { ops: usize, targets: usize },

    /// `embed` target outside the register
    #[error("embed: target freedom {target} out of range for {n_freedoms} freedoms")]
    EmbedTarget { target: usize, n_freedoms: usize },

    /// `embed` received the same target twice
    #[error("embed: target freedom {target} given twice")]
    EmbedDuplicate { target: usize },

    /// Lindblad channel lists of different lengths
    #[error("Expected matching channel lists, got {l} L and {l_dag} L-dagger operators")]
    ChannelArity { l: usize, l_dag: usize },

    /// Relaxation times violate the dephasing bound
    #[error("T2 ({t2}) must not exceed 2*T1 ({t1_doubled})")]
    RelaxationTimes { t2: f64, t1_doubled: f64 },
}

/// Result type for operator operations
pub type Result<T> = std::result::Result<T, OpError>;
