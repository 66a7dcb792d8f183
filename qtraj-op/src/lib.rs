//! Operator layer of the `qtraj` trajectory simulator
//!
//! Everything that acts linearly on a state enters derivative evaluation
//! through one contract, [`Operator::apply`]. Two families implement it:
//!
//! - **Primitive strided operators** ([`PrimOp`], [`Prim2Op`]): a fixed
//!   2x2 or 4x4 action on one or two designated freedoms, applied in
//!   place through a strided view without materializing a matrix.
//! - **Sparse operators** ([`SparseOp`]): an explicit CSR matrix over the
//!   full product space with algebraic composition and tracked matrix
//!   properties (symmetry, hermiticity, diagonality, triangularity) that
//!   select the fast diagonal apply path.
//!
//! [`embed`] lifts small operators into a register by tensoring with
//! identities; the [`lindblad`] module builds the standard dissipation
//! channels from relaxation rates.
//!
//! # Example
//!
//! ```
//! use qtraj_op::{embed, Operator, SparseOp};
//! use qtraj_state::State;
//! use num_complex::Complex64;
//!
//! // H = X₀ + Z₁ on two qubits
//! let h = {
//!     let x0 = embed(2, &[SparseOp::sigma_x()], &[0]).unwrap();
//!     let z1 = embed(2, &[SparseOp::sigma_z()], &[1]).unwrap();
//!     &x0 + &z1
//! };
//!
//! let psi = State::basis(&[2, 2], 0).unwrap();
//! let mut out = psi.clone();
//! h.apply(&mut out, &psi, 0.0).unwrap();
//! ```

pub mod csr;
pub mod error;
pub mod lindblad;
pub mod operator;
pub mod prim;
pub mod property;
pub mod sparse;

pub use csr::CsrMatrix;
pub use error::{OpError, Result};
pub use lindblad::{
    amplitude_damping, amplitude_damping_sparse, depolarizing, depolarizing_sparse,
    phase_damping, phase_damping_sparse, relaxation, relaxation_sparse, Lindblad,
};
pub use operator::Operator;
pub use prim::{Prim2Kind, Prim2Op, PrimKind, PrimOp};
pub use property::{OpProperty, Symmetry, Triangular};
pub use sparse::{embed, sum_ldag_l, tensor, SparseOp};
