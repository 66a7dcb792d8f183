//! Tensor-product quantum state vectors with buffer pooling
//!
//! This crate provides the state layer of the `qtraj` trajectory
//! simulator: a complex amplitude vector over an ordered list of subsystem
//! dimensions ("freedoms"), BLAS-1 style arithmetic, computational-basis
//! measurement with partial collapse, and a shape-keyed buffer pool that
//! keeps repeated small-state allocation off the heap.
//!
//! # Example
//!
//! ```
//! use qtraj_state::{State, StatePool};
//! use num_complex::Complex64;
//!
//! // Two qubits in |10⟩
//! let mut psi = State::basis(&[2, 2], 2).unwrap();
//! assert_eq!(psi.n_freedoms(), 2);
//!
//! // Scratch buffers come from a pool
//! let pool = StatePool::new();
//! let mut tmp = pool.allocate_similar(&psi);
//! tmp.mul(Complex64::new(0.0, 1.0), &psi);
//! ```

pub mod error;
pub mod pool;
pub mod state;

pub use error::{Result, StateError};
pub use pool::{PooledState, StatePool};
pub use state::State;
