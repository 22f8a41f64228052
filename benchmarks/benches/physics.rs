//! Physics and simulation benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::Vec3;
use skid::physics::broadphase::SpatialHashGrid;
use skid::{PhysicsConfig, PhysicsWorld};
use skid_bench::*;

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn bench_broadphase(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("broadphase/uniform_spheres");
        for &n in &[100, 500, 1000, 2000] {
            let world = setup_sphere_world(n);
            let mut broadphase = SpatialHashGrid::new();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| broadphase.find_pairs(&world));
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/street");
        for &n in &[100, 350, 1000] {
            let world = setup_street_world(n);
            let mut broadphase = SpatialHashGrid::new();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| broadphase.find_pairs(&world));
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/box_stack");
    for &n in &[10, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut world = PhysicsWorld::new(PhysicsConfig::default());
            world.create_ground_plane(0.0);
            for i in 0..n {
                let pos = Vec3::new((i % 10) as f32 * 1.1, 0.5 + (i / 10) as f32, 0.0);
                world.create_box(pos, Vec3::splat(0.5), 1.0, Default::default());
            }
            b.iter(|| world.step(1.0 / 60.0));
        });
    }
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.bench_function("populated_tick", |b| {
        let mut sim = setup_city(600).expect("city setup");
        let controls = cruise();
        b.iter(|| sim.tick(1.0 / 60.0, &controls));
    });
    group.finish();
}

criterion_group!(benches, bench_broadphase, bench_pipeline, bench_simulation);
criterion_main!(benches);
