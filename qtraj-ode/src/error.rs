//! Error types for the ODE solvers
//!
//! Every variant is fatal to the integration that raised it: there is no
//! retry path. The numerical-failure variants carry the diagnostic values
//! a caller needs to report the failure (error ratio, step size,
//! tolerances).

use qtraj_op::OpError;
use thiserror::Error;

/// Errors raised by the ODE solvers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    /// Requested integration interval is empty or reversed
    #[error("Illegal integration interval: t1 = {t1}, t2 = {t2}")]
    IllegalInterval { t1: f64, t2: f64 },

    /// Adaptive step shrank to nothing without meeting the tolerance
    #[error("Step size underflow: errmax = {errmax}, h = {h}, atol = {atol}")]
    StepUnderflow { errmax: f64, h: f64, atol: f64 },

    /// Step budget exhausted before reaching the end of the interval
    #[error("Maximum number of steps ({max_nsteps}) exceeded at t = {t}")]
    MaxStepsExceeded { max_nsteps: usize, t: f64 },

    /// Requested tolerances are unachievable at the smallest allowed step
    #[error("Tolerances too small: required step {h} below minimum {h_min} at t = {t}")]
    ToleranceTooSmall { t: f64, h: f64, h_min: f64 },

    /// Repeated local error test failures
    ///
    /// The problem may have a singularity, or the inputs are inappropriate.
    #[error("Repeated error test failures at t = {t} with step {h}")]
    RepeatedErrorFailures { t: f64, h: f64 },

    /// Corrector iteration kept failing to converge
    ///
    /// Usually a wrong method/iteration choice or tolerances for the
    /// problem's stiffness.
    #[error("Repeated corrector convergence failures at t = {t} with step {h}")]
    RepeatedConvergenceFailures { t: f64, h: f64 },

    /// An error weight vanished (component hit zero with a zero absolute
    /// tolerance)
    #[error("Error weight became zero for component {index}")]
    ZeroErrorWeight { index: usize },

    /// A single-step call was made without initialization
    #[error("solve_one_step called before init_one_step")]
    NotInitialized,

    /// Operator failure inside a derivative evaluation
    #[error(transparent)]
    Op(#[from] OpError),
}

/// Result type for ODE solving
pub type Result<T> = std::result::Result<T, OdeError>;
