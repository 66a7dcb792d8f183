//! Quantum state diffusion unraveling
//!
//! Instead of discrete jumps, the state follows a continuous stochastic
//! differential equation: the deterministic drift carries the
//! mean-field-corrected dissipator
//! `Σᵢ (⟨Lᵢ⟩* Lᵢ - ½ L†ᵢLᵢ - ½ ⟨Lᵢ⟩*⟨Lᵢ⟩) ψ`, and after each fixed
//! stochastic step every channel adds a complex-Gaussian-weighted
//! fluctuation `√h·ξᵢ·(Lᵢ - ⟨Lᵢ⟩)ψ`, followed by renormalization.
//!
//! Ref: Gisin & Percival, J. Phys. A 25, 5677 (1992).

use crate::error::{Result, UnravelError};
use crate::noise::ComplexNormal;
use crate::unraveling::Unraveling;
use num_complex::Complex64;
use qtraj_ode::{Ode, OdeSolver};
use qtraj_op::{Lindblad, Operator, SparseOp};
use qtraj_state::{State, StatePool};

const MI: Complex64 = Complex64::new(0.0, -1.0);

#[inline]
fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// Quantum-state-diffusion unraveling over a Hamiltonian and a set of
/// Lindblad channels
///
/// Evolution proceeds in whole stochastic steps of the configured size;
/// when the step does not divide the requested interval the final step
/// runs to completion past the interval end. As with the jump method, an
/// optional precomputed `Σ L†L` aggregate replaces the per-channel
/// dissipator loop in the drift; the caller keeps it consistent with the
/// channel list.
pub struct DiffusionUnraveling {
    hamiltonian: Box<dyn Operator>,
    channels: Vec<Lindblad>,
    aggregate: Option<SparseOp>,

    pool: StatePool,
    noise: ComplexNormal,

    /// Stochastic step size; zero means unset
    h_stoch: f64,
}

impl DiffusionUnraveling {
    pub fn new(
        hamiltonian: Box<dyn Operator>,
        channels: Vec<Lindblad>,
        pool: StatePool,
        noise: ComplexNormal,
    ) -> Self {
        Self {
            hamiltonian,
            channels,
            aggregate: None,
            pool,
            noise,
            h_stoch: 0.0,
        }
    }

    /// Install the precomputed aggregate dissipator `Σ L†L`
    pub fn with_aggregate(mut self, sum_ldag_l: SparseOp) -> Self {
        self.aggregate = Some(sum_ldag_l);
        self
    }

    /// Size of one stochastic step
    pub fn with_stochastic_step(mut self, h_stoch: f64) -> Self {
        self.h_stoch = h_stoch;
        self
    }

    /// Replace the channel list, discarding any installed aggregate
    pub fn set_channels(&mut self, channels: Vec<Lindblad>) {
        self.channels = channels;
        self.aggregate = None;
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Add the per-channel stochastic increments accumulated over one
    /// step to `psi`, reading expectation values from the pre-step state
    /// `y`, then renormalize
    fn apply_stochastic(&mut self, psi: &mut State, y: &State, t: f64, h: f64) -> Result<()> {
        let mut tmp = self.pool.allocate_similar(y);
        let sqrt_h = h.sqrt();

        for channel in &self.channels {
            channel.l.apply(&mut tmp, y, t)?;
            let expectation = y.inner(&tmp);

            let dxi = re(sqrt_h) * self.noise.sample();
            psi.axpy(dxi, &tmp);
            psi.axpy(-dxi * expectation, y);
        }

        psi.normalize();
        Ok(())
    }
}

impl Ode for DiffusionUnraveling {
    /// `dψ = -iH ψ + Σ (⟨L⟩* L - ½ L†L - ½ ⟨L⟩*⟨L⟩) ψ`
    fn derivative(&mut self, dy: &mut State, y: &State, t: f64) -> qtraj_ode::Result<()> {
        self.hamiltonian.apply(dy, y, t)?;
        dy.scale(MI);

        if self.channels.is_empty() {
            return Ok(());
        }

        let mut tmp1 = self.pool.allocate_similar(y);
        let mut expectation_sqr_sum = 0.0;

        match &self.aggregate {
            Some(sum_ldag_l) => {
                for channel in &self.channels {
                    channel.l.apply(&mut tmp1, y, t)?;
                    let expectation = y.inner(&tmp1);
                    dy.axpy(expectation.conj(), &tmp1);
                    expectation_sqr_sum += expectation.norm_sqr();
                }
                sum_ldag_l.axpy_apply(dy, re(-0.5), y, t)?;
            }
            None => {
                let mut tmp2 = self.pool.allocate_similar(y);
                for channel in &self.channels {
                    channel.l.apply(&mut tmp1, y, t)?;
                    let expectation = y.inner(&tmp1);
                    dy.axpy(expectation.conj(), &tmp1);

                    channel.l_dag.apply(&mut tmp2, &tmp1, t)?;
                    dy.axpy(re(-0.5), &tmp2);

                    expectation_sqr_sum += expectation.norm_sqr();
                }
            }
        }

        dy.axpy(re(-0.5 * expectation_sqr_sum), y);
        Ok(())
    }
}

impl Unraveling for DiffusionUnraveling {
    fn solve(
        &mut self,
        solver: &mut dyn OdeSolver,
        psi: &mut State,
        mut t1: f64,
        t2: f64,
    ) -> Result<()> {
        if self.channels.is_empty() {
            solver.solve(self, psi, t1, t2)?;
            return Ok(());
        }

        if self.h_stoch == 0.0 {
            return Err(UnravelError::StochasticStepUnset);
        }
        if self.h_stoch > t2 - t1 {
            return Err(UnravelError::StochasticStepTooLarge {
                h_stoch: self.h_stoch,
                span: t2 - t1,
            });
        }

        let h = self.h_stoch;
        let mut psi_last = self.pool.allocate_similar(psi);

        while t1 < t2 {
            psi_last.assign(psi);
            solver.solve(self, psi, t1, t1 + h)?;
            self.apply_stochastic(psi, &psi_last, t1, h)?;
            t1 += h;
        }
        Ok(())
    }

    /// State diffusion keeps no trajectory-local bookkeeping; fresh
    /// trajectories only need an independent noise stream
    fn new_trajectory(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qtraj_op::amplitude_damping;
    use qtraj_ode::Rk45Solver;

    fn damping_diffusion(t1_time: f64, seed: u64) -> (DiffusionUnraveling, Rk45Solver) {
        let pool = StatePool::new();
        let unraveling = DiffusionUnraveling::new(
            Box::new(SparseOp::zeros(2, 2)),
            vec![amplitude_damping(0, t1_time)],
            pool.clone(),
            ComplexNormal::seed_from_u64(seed),
        )
        .with_stochastic_step(0.01);
        let solver = Rk45Solver::new(pool).with_atol(1e-9);
        (unraveling, solver)
    }

    #[test]
    fn test_norm_is_preserved() {
        let (mut unraveling, mut solver) = damping_diffusion(1.0, 11);
        let mut psi = State::basis(&[2], 1).unwrap();
        unraveling.solve(&mut solver, &mut psi, 0.0, 0.5).unwrap();
        assert_relative_eq!(psi.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_step_must_be_set() {
        let pool = StatePool::new();
        let mut unraveling = DiffusionUnraveling::new(
            Box::new(SparseOp::zeros(2, 2)),
            vec![amplitude_damping(0, 1.0)],
            pool.clone(),
            ComplexNormal::seed_from_u64(0),
        );
        let mut solver = Rk45Solver::new(pool);
        let mut psi = State::basis(&[2], 1).unwrap();
        assert!(matches!(
            unraveling.solve(&mut solver, &mut psi, 0.0, 1.0),
            Err(UnravelError::StochasticStepUnset)
        ));
    }

    #[test]
    fn test_step_must_fit_interval() {
        let (mut unraveling, mut solver) = damping_diffusion(1.0, 0);
        let mut psi = State::basis(&[2], 1).unwrap();
        assert!(matches!(
            unraveling.solve(&mut solver, &mut psi, 0.0, 0.005),
            Err(UnravelError::StochasticStepTooLarge { .. })
        ));
    }

    #[test]
    fn test_no_channels_delegates() {
        let pool = StatePool::new();
        let omega = 1.0;
        let h = &SparseOp::sigma_z() * re(omega / 2.0);
        let mut unraveling = DiffusionUnraveling::new(
            Box::new(h),
            Vec::new(),
            pool.clone(),
            ComplexNormal::seed_from_u64(0),
        );
        let mut solver = Rk45Solver::new(pool).with_atol(1e-12);

        let mut psi = State::basis(&[2], 0).unwrap();
        unraveling.solve(&mut solver, &mut psi, 0.0, 2.0).unwrap();
        // e^{-iωt/2} phase on |0⟩
        assert_relative_eq!(psi.amplitudes()[0].re, 1.0_f64.cos(), epsilon = 1e-8);
        assert_relative_eq!(psi.amplitudes()[0].im, -(1.0_f64.sin()), epsilon = 1e-8);
    }

    #[test]
    fn test_ensemble_mean_matches_t1_decay() {
        // The trajectory average of the excited population reproduces the
        // master equation: p₁(t) = e^{-t/T1}
        let t1_time = 1.0;
        let t_end = 0.5;
        let n_traj = 400;

        let mut mean_p1 = 0.0;
        let (mut unraveling, mut solver) = damping_diffusion(t1_time, 2024);
        for _ in 0..n_traj {
            Unraveling::new_trajectory(&mut unraveling);
            let mut psi = State::basis(&[2], 1).unwrap();
            unraveling.solve(&mut solver, &mut psi, 0.0, t_end).unwrap();
            mean_p1 += psi.amplitudes()[1].norm_sqr();
        }
        mean_p1 /= n_traj as f64;

        let expected = (-t_end / t1_time).exp();
        assert!(
            (mean_p1 - expected).abs() < 0.06,
            "ensemble mean {mean_p1}, master equation {expected}"
        );
    }

    #[test]
    fn test_aggregate_drift_matches_plain() {
        // Compare single derivative evaluations, not whole trajectories
        let t1_time = 2.0;
        let pool = StatePool::new();
        let channels = || vec![amplitude_damping(0, t1_time)];

        let mut plain = DiffusionUnraveling::new(
            Box::new(SparseOp::zeros(2, 2)),
            channels(),
            pool.clone(),
            ComplexNormal::seed_from_u64(1),
        );

        let l = &SparseOp::sigma_plus() * re(1.0 / t1_time.sqrt());
        let ld = &SparseOp::sigma_minus() * re(1.0 / t1_time.sqrt());
        let agg = qtraj_op::sum_ldag_l(&[l], &[ld]).unwrap();
        let mut optimized = DiffusionUnraveling::new(
            Box::new(SparseOp::zeros(2, 2)),
            channels(),
            pool.clone(),
            ComplexNormal::seed_from_u64(1),
        )
        .with_aggregate(agg);

        let psi = {
            let mut s = State::basis(&[2], 1).unwrap();
            s.amplitudes_mut()[0] = Complex64::new(0.6, 0.0);
            s.amplitudes_mut()[1] = Complex64::new(0.0, 0.8);
            s
        };
        let mut dy_a = psi.clone();
        let mut dy_b = psi.clone();
        plain.derivative(&mut dy_a, &psi, 0.0).unwrap();
        optimized.derivative(&mut dy_b, &psi, 0.0).unwrap();

        for (a, b) in dy_a.amplitudes().iter().zip(dy_b.amplitudes()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }
}
