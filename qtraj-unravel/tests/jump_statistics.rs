//! Statistical validation of the quantum-jump unraveling
//!
//! A single amplitude-damping channel has an analytically known jump-time
//! law: the waiting time is exponential with rate 1/T1. Large trajectory
//! ensembles check the empirical distribution against it.

use qtraj_op::{amplitude_damping, SparseOp};
use qtraj_ode::Rk45Solver;
use qtraj_state::{State, StatePool};
use qtraj_unravel::{JumpUnraveling, Unraveling};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Kolmogorov-Smirnov statistic of samples against Exp(rate)
fn ks_statistic(samples: &mut [f64], rate: f64) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = samples.len() as f64;
    let mut d: f64 = 0.0;
    for (i, &t) in samples.iter().enumerate() {
        let cdf = 1.0 - (-rate * t).exp();
        let lo = i as f64 / n;
        let hi = (i + 1) as f64 / n;
        d = d.max((cdf - lo).abs()).max((hi - cdf).abs());
    }
    d
}

#[test]
fn jump_times_follow_exponential_law() {
    let t1_time = 1.0;
    let n_traj = 10_000;
    // Long enough that every trajectory jumps
    let t_end = 25.0 * t1_time;

    let pool = StatePool::new();
    let mut unraveling = JumpUnraveling::new(
        Box::new(SparseOp::zeros(2, 2)),
        vec![amplitude_damping(0, t1_time)],
        pool.clone(),
        StdRng::seed_from_u64(0xFEED),
    );
    let mut solver = Rk45Solver::new(pool).with_atol(1e-9);

    let mut jump_times = Vec::with_capacity(n_traj);
    for _ in 0..n_traj {
        unraveling.new_trajectory();
        let mut psi = State::basis(&[2], 1).unwrap();
        unraveling.solve(&mut solver, &mut psi, 0.0, t_end).unwrap();

        let jumps = unraveling.jumps();
        assert_eq!(jumps.len(), 1, "expected exactly one decay event");
        jump_times.push(jumps[0].time);
    }

    // Sample mean of Exp(1/T1) is T1, standard error T1/√n
    let mean: f64 = jump_times.iter().sum::<f64>() / n_traj as f64;
    assert!(
        (mean - t1_time).abs() < 5.0 * t1_time / (n_traj as f64).sqrt(),
        "mean jump time {mean}, expected {t1_time}"
    );

    // KS test at the 1% level: critical value 1.63/√n, padded for the
    // finite accuracy of the located jump times
    let d = ks_statistic(&mut jump_times, 1.0 / t1_time);
    let critical = 1.63 / (n_traj as f64).sqrt() + 2e-3;
    assert!(
        d < critical,
        "KS statistic {d} above critical value {critical}"
    );
}

#[test]
fn relaxation_channel_shares_follow_rates() {
    // Two competing decay channels on one qubit with rates γ and 2γ:
    // channel 1 should claim two thirds of the first jumps.
    let n_traj = 4000;
    let pool = StatePool::new();

    let slow = amplitude_damping(0, 1.0);
    let fast = amplitude_damping(0, 0.5);
    let mut unraveling = JumpUnraveling::new(
        Box::new(SparseOp::zeros(2, 2)),
        vec![slow, fast],
        pool.clone(),
        StdRng::seed_from_u64(31),
    );
    let mut solver = Rk45Solver::new(pool).with_atol(1e-9);

    let mut fast_count = 0;
    for _ in 0..n_traj {
        unraveling.new_trajectory();
        let mut psi = State::basis(&[2], 1).unwrap();
        unraveling.solve(&mut solver, &mut psi, 0.0, 20.0).unwrap();
        let jumps = unraveling.jumps();
        assert!(!jumps.is_empty());
        if jumps[0].channel == 1 {
            fast_count += 1;
        }
    }

    let share = fast_count as f64 / n_traj as f64;
    assert!(
        (share - 2.0 / 3.0).abs() < 0.03,
        "fast-channel share {share}, expected 2/3"
    );
}
