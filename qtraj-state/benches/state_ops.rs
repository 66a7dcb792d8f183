//! Benchmarks for state arithmetic and pooled allocation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_complex::Complex64;
use qtraj_state::{State, StatePool};

fn bench_axpy(c: &mut Criterion) {
    let mut group = c.benchmark_group("axpy");
    for n_qubits in [6, 10, 14] {
        let dims = vec![2usize; n_qubits];
        let x = State::basis(&dims, 0).unwrap();
        let mut y = State::basis(&dims, 1).unwrap();
        let a = Complex64::new(0.3, -0.7);

        group.bench_function(format!("{n_qubits}_qubits"), |b| {
            b.iter(|| {
                y.axpy(black_box(a), black_box(&x));
            })
        });
    }
    group.finish();
}

fn bench_pool_vs_alloc(c: &mut Criterion) {
    let dims = vec![2usize; 10];
    let reference = State::basis(&dims, 0).unwrap();

    let pool = StatePool::new();
    pool.reserve(4, &reference);

    c.bench_function("pooled_lease", |b| {
        b.iter(|| {
            let s = pool.allocate_similar(black_box(&reference));
            black_box(s.total())
        })
    });

    c.bench_function("fresh_alloc", |b| {
        b.iter(|| {
            let s = State::basis(black_box(&dims), 0).unwrap();
            black_box(s.total())
        })
    });
}

criterion_group!(benches, bench_axpy, bench_pool_vs_alloc);
criterion_main!(benches);
