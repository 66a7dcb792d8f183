//! The ODE and solver contracts

use crate::error::Result;
use qtraj_state::State;

/// A first-order complex ODE `dy/dt = f(y, t)`
pub trait Ode {
    /// Evaluate the right-hand side into `dy`
    ///
    /// Must not mutate `y`; `dy` is overwritten, never read.
    fn derivative(&mut self, dy: &mut State, y: &State, t: f64) -> Result<()>;
}

/// An initial-value integrator over [`State`] vectors
///
/// Besides plain [`solve`](OdeSolver::solve), the two-phase single-step
/// protocol ([`init_one_step`](OdeSolver::init_one_step) followed by
/// repeated [`solve_one_step`](OdeSolver::solve_one_step)) lets a caller
/// inspect the state between internal steps; the unraveling layer uses
/// this to watch for norm-threshold crossings.
pub trait OdeSolver {
    /// Advance `psi` from `t1` to `t2` in place
    fn solve(&mut self, ode: &mut dyn Ode, psi: &mut State, t1: f64, t2: f64) -> Result<()>;

    /// Prepare the single-step protocol for an integration from `t1` to
    /// `t2` starting at `psi`
    fn init_one_step(&mut self, ode: &mut dyn Ode, psi: &State, t1: f64, t2: f64) -> Result<()>;

    /// Take one internal step from `t1`, never passing `t2`
    ///
    /// Returns the step size actually taken.
    fn solve_one_step(
        &mut self,
        ode: &mut dyn Ode,
        psi: &mut State,
        t1: f64,
        t2: f64,
    ) -> Result<f64>;
}
