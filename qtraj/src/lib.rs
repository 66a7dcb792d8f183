//! # qtraj: stochastic trajectory simulation of open quantum systems
//!
//! `qtraj` solves the time evolution of quantum systems coupled to an
//! environment by unraveling the Lindblad master equation into stochastic
//! trajectories over pure state vectors. The workspace is split into
//! focused crates, all re-exported here:
//!
//! - [`state`]: tensor-product state vectors, measurement, buffer pooling
//! - [`op`]: the operator contract, primitive strided operators, sparse
//!   operators with property tracking, Lindblad channel builders
//! - [`ode`]: adaptive integrators (embedded RK 4(5), variable-order
//!   Adams/BDF multistep)
//! - [`unravel`]: quantum-jump Monte Carlo and quantum state diffusion
//!
//! # Quick start
//!
//! Evolve one amplitude-damping trajectory and read off the decay event:
//!
//! ```
//! use qtraj::op::{amplitude_damping, SparseOp};
//! use qtraj::ode::Rk45Solver;
//! use qtraj::state::{State, StatePool};
//! use qtraj::unravel::{JumpUnraveling, Unraveling};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let pool = StatePool::new();
//! let mut trajectory = JumpUnraveling::new(
//!     Box::new(SparseOp::zeros(2, 2)),          // free evolution
//!     vec![amplitude_damping(0, 1.0)],          // T1 = 1
//!     pool.clone(),
//!     StdRng::seed_from_u64(7),
//! );
//!
//! let mut solver = Rk45Solver::new(pool);
//! let mut psi = State::basis(&[2], 1).unwrap(); // start excited
//! trajectory.solve(&mut solver, &mut psi, 0.0, 30.0).unwrap();
//!
//! assert_eq!(trajectory.jumps().len(), 1);
//! ```
//!
//! Trajectories are independent; parallelize by giving each worker its
//! own pool, rng, solver and unraveling (see the
//! `parallel_trajectories` example).

pub use qtraj_ode as ode;
pub use qtraj_op as op;
pub use qtraj_state as state;
pub use qtraj_unravel as unravel;

pub use qtraj_ode::{
    IterationMode, MultistepMethod, MultistepSolver, Ode, OdeSolver, Rk45Solver,
};
pub use qtraj_op::{
    embed, sum_ldag_l, tensor, Lindblad, Operator, Prim2Op, PrimOp, SparseOp,
};
pub use qtraj_state::{State, StatePool};
pub use qtraj_unravel::{
    ComplexNormal, DiffusionUnraveling, JumpInfo, JumpUnraveling, Unraveling,
};
