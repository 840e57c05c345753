//! Benchmarks for the per-tick cost of the table controllers
//!
//! Run with: cargo bench --bench pid

use ballus_core::{Pid, PidConfig, TableControllers, TableTuning};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Benchmark a single PID update
fn bench_pid_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("PID");

    group.bench_function("Z axis (P only) update", |b| {
        let mut pid = Pid::new(PidConfig::table_z()).unwrap();
        let dt = 0.01; // 100Hz

        b.iter(|| black_box(pid.update(black_box(12.5), dt)))
    });

    group.bench_function("X-Y axis (filtered PID) update", |b| {
        let mut pid = Pid::new(PidConfig::table_xy()).unwrap();
        let dt = 0.01;

        b.iter(|| black_box(pid.update(black_box(12.5), dt)))
    });

    group.bench_function("terms", |b| {
        let pid = Pid::new(PidConfig::table_xy()).unwrap();
        b.iter(|| black_box(pid.terms(black_box(12.5), 0.01)))
    });

    group.finish();
}

/// Benchmark sequences of updates with a decaying error
fn bench_pid_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("PID Sequence");

    for n in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("updates", n), n, |b, &n| {
            let mut pid = Pid::new(PidConfig::table_xy()).unwrap();
            let dt = 0.01;

            b.iter(|| {
                for i in 0..n {
                    let error = 200.0 * (-0.1 * i as f64).exp();
                    let _ = black_box(pid.update(error, dt));
                }
                pid.reset();
            })
        });
    }

    group.finish();
}

/// Benchmark one tick of all three axes
fn bench_table_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("Table");

    group.bench_function("update_xyz", |b| {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        b.iter(|| black_box(table.update_xyz(black_box([12.0, -8.0, 30.0]), 0.01)))
    });

    group.finish();
}

criterion_group!(benches, bench_pid_update, bench_pid_sequence, bench_table_tick);
criterion_main!(benches);
