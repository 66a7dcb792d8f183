//! Embedded Runge-Kutta 4(5) with adaptive step control
//!
//! Cash-Karp coefficients: every step produces a fifth-order result and a
//! fourth-order companion whose difference estimates the local error at
//! the cost of a single extra weighted sum. Step acceptance follows the
//! classic control law: reject and shrink while the scaled error exceeds
//! one, grow the next step by the error-dependent factor otherwise.
//!
//! Ref: Cash & Karp, ACM TOMS 16 (1990); Press et al., "Numerical
//! Recipes", ch. 16.2.

use crate::error::{OdeError, Result};
use crate::ode::{Ode, OdeSolver};
use num_complex::Complex64;
use qtraj_state::{State, StatePool};

const SAFETY: f64 = 0.9;
const PGROW: f64 = -0.2;
const PSHRNK: f64 = -0.25;
/// Scaled error below which the next step grows by the full factor of 5
const ERRCON: f64 = 1.89e-4;

// Cash-Karp tableau
const A2: f64 = 0.2;
const A3: f64 = 0.3;
const A4: f64 = 0.6;
const A5: f64 = 1.0;
const A6: f64 = 0.875;

const B21: f64 = 1.0 / 5.0;
const B31: f64 = 3.0 / 40.0;
const B32: f64 = 9.0 / 40.0;
const B41: f64 = 3.0 / 10.0;
const B42: f64 = -9.0 / 10.0;
const B43: f64 = 6.0 / 5.0;
const B51: f64 = -11.0 / 54.0;
const B52: f64 = 5.0 / 2.0;
const B53: f64 = -70.0 / 27.0;
const B54: f64 = 35.0 / 27.0;
const B61: f64 = 1631.0 / 55296.0;
const B62: f64 = 175.0 / 512.0;
const B63: f64 = 575.0 / 13824.0;
const B64: f64 = 44275.0 / 110592.0;
const B65: f64 = 253.0 / 4096.0;

const C1: f64 = 37.0 / 378.0;
const C3: f64 = 250.0 / 621.0;
const C4: f64 = 125.0 / 594.0;
const C6: f64 = 512.0 / 1771.0;

// Fifth-order weights minus the embedded fourth-order weights
const DC1: f64 = C1 - 2825.0 / 27648.0;
const DC3: f64 = C3 - 18575.0 / 48384.0;
const DC4: f64 = C4 - 13525.0 / 55296.0;
const DC5: f64 = -277.0 / 14336.0;
const DC6: f64 = C6 - 0.25;

#[inline]
fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// Adaptive embedded Runge-Kutta 4(5) integrator
///
/// # Example
///
/// ```
/// use qtraj_ode::{Ode, OdeSolver, Rk45Solver, Result};
/// use qtraj_state::{State, StatePool};
/// use num_complex::Complex64;
///
/// struct Rotation;
/// impl Ode for Rotation {
///     fn derivative(&mut self, dy: &mut State, y: &State, _t: f64) -> Result<()> {
///         dy.mul(Complex64::new(0.0, -1.0), y); // dy/dt = -i y
///         Ok(())
///     }
/// }
///
/// let pool = StatePool::new();
/// let mut solver = Rk45Solver::new(pool).with_atol(1e-10);
/// let mut psi = State::basis(&[2], 0).unwrap();
/// solver.solve(&mut Rotation, &mut psi, 0.0, 1.0).unwrap();
/// ```
pub struct Rk45Solver {
    pool: StatePool,

    atol: f64,
    h_suggested: f64,
    h_min: f64,
    h_max: f64,
    max_nsteps: usize,

    /// Suggested size of the next step, carried across the single-step
    /// protocol
    h_next: f64,
    initialized: bool,
}

impl Rk45Solver {
    pub fn new(pool: StatePool) -> Self {
        Self {
            pool,
            atol: 1e-8,
            h_suggested: 0.01,
            h_min: 0.0,
            h_max: f64::INFINITY,
            max_nsteps: 10_000,
            h_next: 0.0,
            initialized: false,
        }
    }

    /// Absolute tolerance on the local error norm (default 1e-8)
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// First trial step size (default 0.01)
    pub fn with_suggested_first_step(mut self, h: f64) -> Self {
        self.h_suggested = h;
        self
    }

    /// Smallest allowed step (default 0)
    pub fn with_min_step(mut self, h_min: f64) -> Self {
        self.h_min = h_min;
        self
    }

    /// Largest allowed step (default unbounded)
    pub fn with_max_step(mut self, h_max: f64) -> Self {
        self.h_max = h_max;
        self
    }

    /// Step budget per `solve` call (default 10000)
    pub fn with_max_nsteps(mut self, max_nsteps: usize) -> Self {
        self.max_nsteps = max_nsteps;
        self
    }

    /// One Cash-Karp evaluation: given `y` at `t` and a step `h`, write
    /// the fifth-order result into `yout` and the embedded error estimate
    /// into `yerr`.
    fn rkck(
        &self,
        ode: &mut dyn Ode,
        yout: &mut State,
        yerr: &mut State,
        y: &State,
        t: f64,
        h: f64,
    ) -> Result<()> {
        let mut k1 = self.pool.allocate_similar(y);
        let mut k2 = self.pool.allocate_similar(y);
        let mut k3 = self.pool.allocate_similar(y);
        let mut k4 = self.pool.allocate_similar(y);
        let mut k5 = self.pool.allocate_similar(y);

        ode.derivative(&mut k1, y, t)?;

        yout.assign(y);
        yout.axpy(re(h * B21), &k1);
        ode.derivative(&mut k2, yout, t + A2 * h)?;

        yout.assign(y);
        yout.axpy(re(h * B31), &k1);
        yout.axpy(re(h * B32), &k2);
        ode.derivative(&mut k3, yout, t + A3 * h)?;

        yout.assign(y);
        yout.axpy(re(h * B41), &k1);
        yout.axpy(re(h * B42), &k2);
        yout.axpy(re(h * B43), &k3);
        ode.derivative(&mut k4, yout, t + A4 * h)?;

        yout.assign(y);
        yout.axpy(re(h * B51), &k1);
        yout.axpy(re(h * B52), &k2);
        yout.axpy(re(h * B53), &k3);
        yout.axpy(re(h * B54), &k4);
        ode.derivative(&mut k5, yout, t + A5 * h)?;

        yout.assign(y);
        yout.axpy(re(h * B61), &k1);
        yout.axpy(re(h * B62), &k2);
        yout.axpy(re(h * B63), &k3);
        yout.axpy(re(h * B64), &k4);
        yout.axpy(re(h * B65), &k5);
        // k2 is no longer referenced by the remaining sums; reuse it for
        // the sixth stage.
        let k6 = &mut k2;
        ode.derivative(k6, yout, t + A6 * h)?;

        yout.assign(y);
        yout.axpy(re(h * C1), &k1);
        yout.axpy(re(h * C3), &k3);
        yout.axpy(re(h * C4), &k4);
        yout.axpy(re(h * C6), k6);

        yerr.mul(re(h * DC1), &k1);
        yerr.axpy(re(h * DC3), &k3);
        yerr.axpy(re(h * DC4), &k4);
        yerr.axpy(re(h * DC5), &k5);
        yerr.axpy(re(h * DC6), k6);

        Ok(())
    }

    /// One adaptive step from `t`, clamped to never pass `t_ctrl`
    ///
    /// Returns `(h_used, h_next_suggested)`.
    fn rkqs(
        &self,
        ode: &mut dyn Ode,
        yout: &mut State,
        y: &State,
        t: f64,
        t_ctrl: f64,
        mut h: f64,
    ) -> Result<(f64, f64)> {
        let mut yerr = self.pool.allocate_similar(y);

        if h > self.h_max {
            h = self.h_max;
        }
        if h < self.h_min {
            h = self.h_min;
        }
        let h_ctrl = t_ctrl - t;
        if h > h_ctrl {
            h = h_ctrl;
        }

        loop {
            self.rkck(ode, yout, &mut yerr, y, t, h)?;

            let errmax = yerr.norm() / self.atol;
            if errmax > 1.0 {
                // Reject: shrink and retry
                h = SAFETY * h * errmax.powf(PSHRNK);
                if t + h == t {
                    return Err(OdeError::StepUnderflow {
                        errmax,
                        h,
                        atol: self.atol,
                    });
                }
            } else {
                // Accept: suggest the next step size
                let h_next = if errmax > ERRCON {
                    SAFETY * h * errmax.powf(PGROW)
                } else {
                    5.0 * h
                };
                return Ok((h, h_next));
            }
        }
    }
}

impl OdeSolver for Rk45Solver {
    fn solve(&mut self, ode: &mut dyn Ode, psi: &mut State, mut t1: f64, t2: f64) -> Result<()> {
        self.init_one_step(ode, psi, t1, t2)?;

        let mut a = self.pool.allocate_similar(psi);
        let mut b = self.pool.allocate_similar(psi);
        a.assign(psi);

        let (mut y, mut yout) = (&mut a, &mut b);
        for _ in 1..=self.max_nsteps {
            let (h, h_next) = self.rkqs(ode, yout, y, t1, t2, self.h_next)?;
            self.h_next = h_next;
            t1 += h;
            std::mem::swap(&mut y, &mut yout);

            if t1 >= t2 {
                psi.assign(y);
                return Ok(());
            }
        }

        Err(OdeError::MaxStepsExceeded {
            max_nsteps: self.max_nsteps,
            t: t1,
        })
    }

    fn init_one_step(&mut self, _ode: &mut dyn Ode, _psi: &State, t1: f64, t2: f64) -> Result<()> {
        if t2 <= t1 {
            return Err(OdeError::IllegalInterval { t1, t2 });
        }
        self.h_next = self.h_suggested;
        self.initialized = true;
        Ok(())
    }

    fn solve_one_step(
        &mut self,
        ode: &mut dyn Ode,
        psi: &mut State,
        t1: f64,
        t2: f64,
    ) -> Result<f64> {
        if !self.initialized {
            return Err(OdeError::NotInitialized);
        }
        let mut tmp = self.pool.allocate_similar(psi);
        tmp.assign(psi);

        let (h, h_next) = self.rkqs(ode, psi, &tmp, t1, t2, self.h_next)?;
        self.h_next = h_next;
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    /// dy/dt = -i ω y, counting derivative evaluations
    struct Rotation {
        omega: f64,
        evals: usize,
    }

    impl Rotation {
        fn new(omega: f64) -> Self {
            Self { omega, evals: 0 }
        }
    }

    impl Ode for Rotation {
        fn derivative(&mut self, dy: &mut State, y: &State, _t: f64) -> Result<()> {
            self.evals += 1;
            dy.mul(c(0.0, -self.omega), y);
            Ok(())
        }
    }

    fn superposition() -> State {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        State::from_raw(&[2], vec![c(h, 0.0), c(h, 0.0)]).unwrap()
    }

    #[test]
    fn test_one_period_returns_to_start() {
        let omega = 2.0;
        let period = 2.0 * std::f64::consts::PI / omega;
        let atol = 1e-10;

        let mut psi = superposition();
        let start = psi.clone();

        let mut solver = Rk45Solver::new(StatePool::new()).with_atol(atol);
        solver
            .solve(&mut Rotation::new(omega), &mut psi, 0.0, period)
            .unwrap();

        let mut diff = psi.clone();
        diff.axpy(c(-1.0, 0.0), &start);
        assert!(
            diff.norm() < 1e-6,
            "deviation after one period: {}",
            diff.norm()
        );
        assert_relative_eq!(psi.norm(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_phase_accumulation() {
        // After time T the amplitude picks up e^{-iωT}
        let omega = 1.5;
        let t_end = 0.8;
        let mut psi = State::basis(&[2], 0).unwrap();

        let mut solver = Rk45Solver::new(StatePool::new()).with_atol(1e-12);
        solver
            .solve(&mut Rotation::new(omega), &mut psi, 0.0, t_end)
            .unwrap();

        let expected = c((omega * t_end).cos(), -(omega * t_end).sin());
        assert_relative_eq!(psi.amplitudes()[0].re, expected.re, epsilon = 1e-8);
        assert_relative_eq!(psi.amplitudes()[0].im, expected.im, epsilon = 1e-8);
    }

    #[test]
    fn test_step_count_grows_as_tolerance_tightens() {
        let omega = 5.0;
        let period = 2.0 * std::f64::consts::PI / omega;

        let mut counts = Vec::new();
        for atol in [1e-6, 1e-8, 1e-10, 1e-12] {
            let mut ode = Rotation::new(omega);
            let mut psi = superposition();
            let mut solver = Rk45Solver::new(StatePool::new()).with_atol(atol);
            solver.solve(&mut ode, &mut psi, 0.0, period).unwrap();
            counts.push(ode.evals);
        }
        for pair in counts.windows(2) {
            assert!(
                pair[0] <= pair[1],
                "evaluations should not decrease as atol tightens: {counts:?}"
            );
        }
        assert!(counts[0] < counts[3], "tightening atol had no effect");
    }

    #[test]
    fn test_single_step_protocol_never_passes_t2() {
        let mut ode = Rotation::new(1.0);
        let mut psi = superposition();
        let t2 = 0.05;

        let mut solver = Rk45Solver::new(StatePool::new())
            .with_atol(1e-9)
            .with_suggested_first_step(1.0);
        solver.init_one_step(&mut ode, &psi, 0.0, t2).unwrap();

        let mut t = 0.0;
        while t < t2 {
            let h = solver.solve_one_step(&mut ode, &mut psi, t, t2).unwrap();
            assert!(h > 0.0);
            t += h;
            assert!(t <= t2 + 1e-14, "stepped past requested end: {t}");
        }
        assert_relative_eq!(t, t2, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_one_step_requires_init() {
        let mut solver = Rk45Solver::new(StatePool::new());
        let mut psi = superposition();
        assert!(matches!(
            solver.solve_one_step(&mut Rotation::new(1.0), &mut psi, 0.0, 1.0),
            Err(OdeError::NotInitialized)
        ));
    }

    #[test]
    fn test_illegal_interval() {
        let mut solver = Rk45Solver::new(StatePool::new());
        let mut psi = superposition();
        assert!(matches!(
            solver.solve(&mut Rotation::new(1.0), &mut psi, 1.0, 1.0),
            Err(OdeError::IllegalInterval { .. })
        ));
    }

    #[test]
    fn test_step_budget() {
        let mut solver = Rk45Solver::new(StatePool::new())
            .with_atol(1e-12)
            .with_max_step(1e-6)
            .with_max_nsteps(10);
        let mut psi = superposition();
        assert!(matches!(
            solver.solve(&mut Rotation::new(1.0), &mut psi, 0.0, 1.0),
            Err(OdeError::MaxStepsExceeded { max_nsteps: 10, .. })
        ));
    }

    #[test]
    fn test_decay_matches_exponential() {
        // dy/dt = -γ/2 y: norm decays like e^{-γt/2}
        struct Decay;
        impl Ode for Decay {
            fn derivative(&mut self, dy: &mut State, y: &State, _t: f64) -> Result<()> {
                dy.mul(c(-0.5, 0.0), y);
                Ok(())
            }
        }

        let mut psi = State::basis(&[2], 1).unwrap();
        let mut solver = Rk45Solver::new(StatePool::new()).with_atol(1e-11);
        solver.solve(&mut Decay, &mut psi, 0.0, 2.0).unwrap();
        assert_relative_eq!(psi.norm(), (-1.0_f64).exp(), epsilon = 1e-8);
    }
}
