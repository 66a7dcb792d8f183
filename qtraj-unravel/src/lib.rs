//! Stochastic unraveling of open quantum systems
//!
//! This crate turns the deterministic machinery of `qtraj-state`,
//! `qtraj-op` and `qtraj-ode` into physically correct quantum
//! trajectories: single stochastic realizations whose ensemble average
//! reproduces the Lindblad master equation.
//!
//! Two methods implement the [`Unraveling`] contract:
//!
//! - [`JumpUnraveling`]: quantum-jump Monte Carlo, non-Hermitian decay
//!   punctuated by discrete jumps, with the jump times located by an
//!   interpolating root search on the decaying norm and surfaced through
//!   [`JumpUnraveling::jumps`].
//! - [`DiffusionUnraveling`]: quantum state diffusion, continuous
//!   complex-Gaussian increments in fixed stochastic steps.
//!
//! Both take an optional precomputed `Σ L†L` aggregate that replaces the
//! per-channel dissipator loop with a single sparse apply.
//!
//! Trajectories are statistically independent: run them in parallel by
//! giving each worker its own pool, generator, solver and unraveling;
//! none of these types are meant to be shared across threads.

pub mod error;
pub mod jump;
pub mod noise;
pub mod qsd;
pub mod unraveling;

pub use error::{Result, UnravelError};
pub use jump::{JumpInfo, JumpUnraveling};
pub use noise::ComplexNormal;
pub use qsd::DiffusionUnraveling;
pub use unraveling::Unraveling;
