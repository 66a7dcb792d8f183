//! The operator contract shared by every linear map in the simulator

use crate::error::Result;
use qtraj_state::State;

/// A possibly time-dependent linear map on states
///
/// This is the seam between the numerical layers and everything built on
/// top of them: Hamiltonians, Lindblad channels, gates and correction
/// layers all enter derivative evaluation through this trait.
///
/// # Contract
///
/// `apply` writes `op(input; t)` into `out`. It must not read stale
/// contents of `out`, must leave `input` untouched, and `out` must be
/// shape-identical to `input`.
pub trait Operator {
    /// `out = op(input; t)`
    fn apply(&self, out: &mut State, input: &State, t: f64) -> Result<()>;
}

impl<T: Operator + ?Sized> Operator for Box<T> {
    fn apply(&self, out: &mut State, input: &State, t: f64) -> Result<()> {
        (**self).apply(out, input, t)
    }
}
