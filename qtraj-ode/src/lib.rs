//! Adaptive ODE integration for the `qtraj` trajectory simulator
//!
//! Two concrete integrators behind one [`OdeSolver`] contract:
//!
//! - [`Rk45Solver`]: embedded Cash-Karp Runge-Kutta 4(5) with classic
//!   accept/reject step control. The workhorse for the smooth,
//!   non-stiff derivative fields produced by unraveled quantum dynamics.
//! - [`MultistepSolver`]: a variable-order Nordsieck multistep method,
//!   Adams-Moulton for smooth problems and BDF for stiff ones, with
//!   weighted-RMS error control and an optional chord corrector.
//!
//! Both expose the two-phase single-step protocol (`init_one_step` /
//! `solve_one_step`) so the unraveling layer can inspect the state
//! between internal steps without giving up adaptive stepping.

pub mod error;
pub mod multistep;
pub mod ode;
pub mod rk45;

pub use error::{OdeError, Result};
pub use multistep::{IterationMode, MultistepMethod, MultistepSolver};
pub use ode::{Ode, OdeSolver};
pub use rk45::Rk45Solver;
