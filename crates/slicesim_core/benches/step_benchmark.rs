//! # Step Engine Benchmark
//!
//! Measures the serial index rebuild and full parallel runs across pool sizes.
//!
//! Run with: cargo bench --package slicesim_core --bench step_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use slicesim_core::physics::init_particles;
use slicesim_core::{Binning, Domain, OutOfRange, ShortRange, SimConfig, Simulation, SpatialIndex};

const PARTICLES: usize = 10_000;

fn bench_index_rebuild(c: &mut Criterion) {
    let domain = Domain::for_particles(PARTICLES).unwrap();
    let store = init_particles(PARTICLES, domain.size(), &mut ChaCha8Rng::seed_from_u64(1));

    for binning in [Binning::Natural, Binning::Legacy] {
        let mut index = SpatialIndex::new(domain, binning, OutOfRange::Clamp);
        c.bench_function(&format!("rebuild_{binning:?}_10k"), |b| {
            b.iter(|| black_box(index.rebuild(store.iter()).unwrap()));
        });
    }
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_2k_x20");
    group.sample_size(10);

    for workers in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let config = SimConfig {
                    particles: 2_000,
                    steps: 20,
                    workers,
                    seed: Some(3),
                    ..SimConfig::default()
                };
                let mut sim = Simulation::new(config).unwrap();
                let law = ShortRange::new(sim.domain().size());
                black_box(sim.run(&law, None).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_rebuild, bench_run);
criterion_main!(benches);
