//! Error types for the unraveling layer

use qtraj_ode::OdeError;
use qtraj_op::OpError;
use thiserror::Error;

/// Errors raised while evolving stochastic trajectories
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnravelError {
    /// The jump-time search did not reach its norm tolerance within the
    /// refinement budget
    ///
    /// Increase the ODE solver accuracy or the refinement budget.
    #[error(
        "Jump time not located: |norm² - {target_norm2}| still above {norm_rtol} (relative) \
         after {max_refinements} refinements"
    )]
    JumpTimeNotLocated {
        target_norm2: f64,
        norm_rtol: f64,
        max_refinements: usize,
    },

    /// The configured stochastic step does not fit into the interval
    #[error("Stochastic step size {h_stoch} exceeds the interval length {span}")]
    StochasticStepTooLarge { h_stoch: f64, span: f64 },

    /// Dissipation channels are present but no stochastic step was set
    #[error("Evolving with dissipation channels, but the stochastic step size is not set")]
    StochasticStepUnset,

    /// Failure inside the deterministic integrator
    #[error(transparent)]
    Ode(#[from] OdeError),

    /// Operator failure outside derivative evaluation (channel application)
    #[error(transparent)]
    Op(#[from] OpError),
}

/// Result type for trajectory evolution
pub type Result<T> = std::result::Result<T, UnravelError>;
