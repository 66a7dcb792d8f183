//! Lindblad dissipation channels
//!
//! A channel is an ordered operator pair `(L, L†)`; the conjugate is kept
//! explicitly because the unraveling layer applies both without ever
//! forming an adjoint. Keeping `l_dag` the true Hermitian conjugate of
//! `l` is a caller contract, not something this layer checks.
//!
//! The builders below assemble the standard single-qubit channels from
//! relaxation rates, either as primitive strided operators addressing one
//! freedom of a larger register, or as explicit 2x2 sparse operators for
//! single-qubit systems and for precomputing aggregate dissipators.

use crate::error::{OpError, Result};
use crate::operator::Operator;
use crate::prim::PrimOp;
use crate::sparse::SparseOp;
use num_complex::Complex64;

/// One dissipation channel: the pair `(L, L†)`
pub struct Lindblad {
    pub l: Box<dyn Operator>,
    pub l_dag: Box<dyn Operator>,
}

impl Lindblad {
    pub fn new(l: Box<dyn Operator>, l_dag: Box<dyn Operator>) -> Self {
        Self { l, l_dag }
    }
}

/// Amplitude damping of the qubit at `target` with relaxation time `t1`
///
/// `L = σ⁺/√T1` (decay from level 1 into level 0).
pub fn amplitude_damping(target: usize, t1: f64) -> Lindblad {
    let c = 1.0 / t1.sqrt();
    Lindblad::new(
        Box::new(PrimOp::raising(target).with_scale(c)),
        Box::new(PrimOp::lowering(target).with_scale(c)),
    )
}

/// Amplitude damping as an explicit 2x2 sparse pair
pub fn amplitude_damping_sparse(t1: f64) -> Lindblad {
    let c = Complex64::new(1.0 / t1.sqrt(), 0.0);
    Lindblad::new(
        Box::new(&SparseOp::sigma_plus() * c),
        Box::new(&SparseOp::sigma_minus() * c),
    )
}

/// Pure dephasing of the qubit at `target` with dephasing time `t2`
///
/// `L = σz/√(2·T2)`; the channel is self-adjoint.
pub fn phase_damping(target: usize, t2: f64) -> Lindblad {
    let c = 1.0 / (2.0 * t2).sqrt();
    Lindblad::new(
        Box::new(PrimOp::z(target).with_scale(c)),
        Box::new(PrimOp::z(target).with_scale(c)),
    )
}

/// Pure dephasing as an explicit 2x2 sparse pair
pub fn phase_damping_sparse(t2: f64) -> Lindblad {
    let c = Complex64::new(1.0 / (2.0 * t2).sqrt(), 0.0);
    Lindblad::new(
        Box::new(&SparseOp::sigma_z() * c),
        Box::new(&SparseOp::sigma_z() * c),
    )
}

/// The measured dephasing time `t2` combines T1 decay and pure dephasing;
/// split off the pure-dephasing part: `1/T2' = 1/T2 - 1/(2·T1)`.
fn pure_dephasing_time(t1: f64, t2: f64) -> Result<f64> {
    if 2.0 * t1 < t2 {
        return Err(OpError::RelaxationTimes {
            t2,
            t1_doubled: 2.0 * t1,
        });
    }
    Ok(1.0 / (1.0 / t2 - 1.0 / (2.0 * t1)))
}

/// The T1/T2 relaxation channels of the qubit at `target`
///
/// A non-positive time disables the corresponding channel; when both are
/// present the measured `t2` is split into its pure-dephasing part.
///
/// # Errors
/// Returns an error when `t2 > 2·t1`.
pub fn relaxation(target: usize, t1: f64, t2: f64) -> Result<Vec<Lindblad>> {
    if t1 > 0.0 && t2 > 0.0 {
        let t2_pure = pure_dephasing_time(t1, t2)?;
        Ok(vec![
            amplitude_damping(target, t1),
            phase_damping(target, t2_pure),
        ])
    } else if t1 > 0.0 {
        Ok(vec![amplitude_damping(target, t1)])
    } else if t2 > 0.0 {
        Ok(vec![phase_damping(target, t2)])
    } else {
        Ok(Vec::new())
    }
}

/// T1/T2 relaxation as explicit 2x2 sparse pairs
pub fn relaxation_sparse(t1: f64, t2: f64) -> Result<Vec<Lindblad>> {
    if t1 > 0.0 && t2 > 0.0 {
        let t2_pure = pure_dephasing_time(t1, t2)?;
        Ok(vec![
            amplitude_damping_sparse(t1),
            phase_damping_sparse(t2_pure),
        ])
    } else if t1 > 0.0 {
        Ok(vec![amplitude_damping_sparse(t1)])
    } else if t2 > 0.0 {
        Ok(vec![phase_damping_sparse(t2)])
    } else {
        Ok(Vec::new())
    }
}

/// Depolarizing noise on the qubit at `target` with rate `gamma`
///
/// Three self-adjoint channels `√γ·X`, `√γ·Y`, `√γ·Z`.
pub fn depolarizing(target: usize, gamma: f64) -> Vec<Lindblad> {
    let c = gamma.sqrt();
    vec![
        Lindblad::new(
            Box::new(PrimOp::x(target).with_scale(c)),
            Box::new(PrimOp::x(target).with_scale(c)),
        ),
        Lindblad::new(
            Box::new(PrimOp::y(target).with_scale(c)),
            Box::new(PrimOp::y(target).with_scale(c)),
        ),
        Lindblad::new(
            Box::new(PrimOp::z(target).with_scale(c)),
            Box::new(PrimOp::z(target).with_scale(c)),
        ),
    ]
}

/// Depolarizing noise as explicit 2x2 sparse pairs
pub fn depolarizing_sparse(gamma: f64) -> Vec<Lindblad> {
    let c = Complex64::new(gamma.sqrt(), 0.0);
    [
        SparseOp::sigma_x(),
        SparseOp::sigma_y(),
        SparseOp::sigma_z(),
    ]
    .into_iter()
    .map(|s| {
        let scaled = &s * c;
        // X and Z are self-adjoint; Y† = Y as well
        Lindblad::new(Box::new(scaled.clone()), Box::new(scaled))
    })
    .collect()
}
