//! The trajectory contract shared by the unraveling methods

use crate::error::Result;
use qtraj_ode::{Ode, OdeSolver};
use qtraj_state::State;

/// A stochastic unraveling of an open-system master equation
///
/// An unraveling is an ODE (the deterministic drift seen by the chosen
/// method) plus a notion of trajectory: [`solve`](Unraveling::solve)
/// advances the state while interleaving the method's stochastic events,
/// and [`new_trajectory`](Unraveling::new_trajectory) resets
/// trajectory-local randomness so the same instance can produce
/// statistically independent runs.
pub trait Unraveling: Ode {
    /// Evolve `psi` from `t1` to `t2` along one trajectory
    fn solve(
        &mut self,
        solver: &mut dyn OdeSolver,
        psi: &mut State,
        t1: f64,
        t2: f64,
    ) -> Result<()>;

    /// Reset trajectory-local state (thresholds, event logs)
    fn new_trajectory(&mut self);
}
