/*
 * Pipeline Benchmark
 *
 * This file contains benchmarks for the flock generation pipeline.
 * It measures the shape sampler, the deformer stack, the projection engine
 * and a full end-to-end generation at several point counts.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use murmuration::{
    compose, deform, generate, project, sample, DeformerConfig, FlockParams, NoiseField,
    ProjectionConfig, ShapeConfig, ShapeKind,
};

const COUNTS: [usize; 4] = [500, 2000, 5000, 10000];

// Benchmark rejection sampling of a single shape
fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample");
    let noise = NoiseField::new(7);

    for count in COUNTS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &n| {
            let mut config = ShapeConfig::default().with_kind(ShapeKind::Torus).with_count(n);
            config.density_noise = 0.4;
            b.iter(|| black_box(sample(&config, &noise)));
        });
    }

    group.finish();
}

// Benchmark the default deformer stack with every stage switched on
fn bench_deform(c: &mut Criterion) {
    let mut group = c.benchmark_group("deform");
    let noise = NoiseField::new(7);

    let mut config = DeformerConfig::default();
    config.smooth.enabled = true;
    config.twist.enabled = true;
    config.taper.enabled = true;
    config.bend.enabled = true;
    config.wave.enabled = true;

    for count in COUNTS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &n| {
            let mut params = FlockParams::default().with_seed(7);
            params.flock.shape.count = n;
            let cloud = compose(&params.flock, &noise);
            b.iter(|| black_box(deform(&cloud, &config, &noise)));
        });
    }

    group.finish();
}

// Benchmark projection with curl headings and density bands
fn bench_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");
    let noise = NoiseField::new(7);

    let mut config = ProjectionConfig::default();
    config.density_band.enabled = true;

    for count in COUNTS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &n| {
            let mut params = FlockParams::default().with_seed(7);
            params.flock.shape.count = n;
            let cloud = compose(&params.flock, &noise);
            b.iter(|| black_box(project(&cloud, &config, &noise)));
        });
    }

    group.finish();
}

// Benchmark the whole pipeline from parameters to primitives
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for count in COUNTS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &n| {
            let mut params = FlockParams::default().with_seed(7);
            params.flock.shape.count = n;
            b.iter(|| black_box(generate(&params)));
        });
    }

    group.finish();
}

// Configure the benchmarks
criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_sample, bench_deform, bench_project, bench_generate
}

criterion_main!(benches);
