//! Rabi-driven qubit with T1/T2 relaxation, one jump trajectory at a time
//!
//! Averages the excited-state population over an ensemble of quantum-jump
//! trajectories and prints it next to the closed-form T1 law for the
//! undriven case.
//!
//! Run with: `cargo run --release --example damped_qubit`

use qtraj::op::relaxation;
use qtraj::{JumpUnraveling, Rk45Solver, SparseOp, State, StatePool, Unraveling};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    let t1 = 2.0;
    let t2 = 3.0;
    let n_traj = 2000;
    let t_end = 1.0;

    let pool = StatePool::new();
    let mut trajectory = JumpUnraveling::new(
        Box::new(SparseOp::zeros(2, 2)),
        relaxation(0, t1, t2).expect("valid relaxation times"),
        pool.clone(),
        StdRng::seed_from_u64(2024),
    );
    let mut solver = Rk45Solver::new(pool).with_atol(1e-10);

    let mut p_excited = 0.0;
    let mut n_jumps = 0;
    for _ in 0..n_traj {
        trajectory.new_trajectory();
        let mut psi = State::basis(&[2], 1).expect("qubit basis state");
        trajectory
            .solve(&mut solver, &mut psi, 0.0, t_end)
            .expect("trajectory evolution");

        p_excited += psi.amplitudes()[1].norm_sqr();
        n_jumps += trajectory.jumps().len();
    }
    p_excited /= n_traj as f64;

    println!("trajectories:       {n_traj}");
    println!("jumps recorded:     {n_jumps}");
    println!("mean P(|1>) at t={t_end}: {p_excited:.4}");
    println!("exp(-t/T1):         {:.4}", (-t_end / t1).exp());

    // A final measurement collapses the ensemble member
    let mut rng = StdRng::seed_from_u64(1);
    let mut psi = State::basis(&[2], 1).expect("qubit basis state");
    trajectory.new_trajectory();
    trajectory
        .solve(&mut solver, &mut psi, 0.0, t_end)
        .expect("trajectory evolution");
    let outcome = psi.measure(&[0], &mut rng).expect("measurement");
    println!("one sampled outcome: |{}>", outcome[0]);
}
