//! Coarse steps of whole simulations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hamr_bench::{refined_profile, uniform_profile};
use hamr_engine::Simulator;

/// Benchmark: one coarse step of 64 cells at 100 particles per cell.
fn bench_uniform_step(c: &mut Criterion) {
    let job = uniform_profile(64, 100).unwrap();
    let mut sim = Simulator::from_dict(&job).unwrap();

    c.bench_function("uniform_step_64x100", |b| {
        b.iter(|| {
            black_box(sim.advance().unwrap());
        });
    });
}

/// Benchmark: one coarse step with a refined middle half, i.e. one
/// level-0 step and two level-1 substeps with their ghost fills and
/// synchronization.
fn bench_refined_step(c: &mut Criterion) {
    let job = refined_profile(64, 100).unwrap();
    let mut sim = Simulator::from_dict(&job).unwrap();

    c.bench_function("refined_step_64x100", |b| {
        b.iter(|| {
            black_box(sim.advance().unwrap());
        });
    });
}

/// Benchmark: build and initialize a two-level simulation.
fn bench_initialization(c: &mut Criterion) {
    let job = refined_profile(64, 100).unwrap();

    c.bench_function("initialize_refined_64x100", |b| {
        b.iter(|| {
            let sim = Simulator::from_dict(&job).unwrap();
            black_box(sim.hierarchy().number_of_levels());
        });
    });
}

criterion_group!(
    benches,
    bench_uniform_step,
    bench_refined_step,
    bench_initialization
);
criterion_main!(benches);
