//! Trajectory ensembles across threads
//!
//! Trajectories are statistically independent, so the natural parallelism
//! is one worker per batch, each with its own pool, generator, solver
//! and unraveling, since none of those types are shared across threads.
//! The core schedules nothing; rayon does the fan-out here.
//!
//! Run with: `cargo run --release --example parallel_trajectories`

use num_complex::Complex64;
use qtraj::op::amplitude_damping;
use qtraj::{embed, JumpUnraveling, Operator, Rk45Solver, SparseOp, State, StatePool, Unraveling};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

fn main() {
    let n_qubits = 4;
    let t1 = 1.5;
    let omega = 2.0;
    let t_end = 2.0;
    let n_traj = 4000;
    let batch = 250;
    let n_batches = n_traj / batch;

    let mean_jumps: f64 = (0..n_batches)
        .into_par_iter()
        .map(|worker| {
            // Per-worker instances: pool, rng, solver, unraveling
            let pool = StatePool::new();

            // σx drive on qubit 0, damping on every qubit
            let drive = embed(
                n_qubits,
                &[&SparseOp::sigma_x() * Complex64::new(omega / 2.0, 0.0)],
                &[0],
            )
            .expect("drive term");
            let channels = (0..n_qubits).map(|q| amplitude_damping(q, t1)).collect();

            let mut trajectory = JumpUnraveling::new(
                Box::new(drive) as Box<dyn Operator>,
                channels,
                pool.clone(),
                StdRng::seed_from_u64(0xC0FFEE + worker as u64),
            );
            let mut solver = Rk45Solver::new(pool).with_atol(1e-8);

            let mut jumps = 0usize;
            for _ in 0..batch {
                trajectory.new_trajectory();
                let mut psi =
                    State::basis(&vec![2; n_qubits], (1 << n_qubits) - 1).expect("all excited");
                trajectory
                    .solve(&mut solver, &mut psi, 0.0, t_end)
                    .expect("trajectory evolution");
                jumps += trajectory.jumps().len();
            }
            jumps as f64 / batch as f64
        })
        .sum::<f64>()
        / n_batches as f64;

    println!("trajectories: {n_traj}");
    println!("mean jumps per trajectory over [0, {t_end}]: {mean_jumps:.3}");
}
