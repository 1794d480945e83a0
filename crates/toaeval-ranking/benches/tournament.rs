use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::hint::black_box;
use toaeval_core::Combination;
use toaeval_ranking::{run_tournament, ErrorDistribution};

const DETECTORS: [&str; 6] = ["None", "FAST", "CHESS", "ORB", "SIFT", "AKAZE"];
const DESCRIPTORS: [&str; 4] = ["BRIEF", "PATCH", "ORB", "SIFT"];

fn entries(points: usize) -> BTreeMap<Combination, ErrorDistribution> {
    let mut entries = BTreeMap::new();
    for (i, det) in DETECTORS.iter().enumerate() {
        for (j, desc) in DESCRIPTORS.iter().enumerate() {
            let scale = 0.1 + 0.05 * (i * DESCRIPTORS.len() + j) as f64;
            let errors = (0..points + 37 * i)
                .map(|k| scale * ((k * 7919 % 1000) as f64 / 1000.0))
                .collect();
            entries.insert(
                Combination::new(*det, *desc),
                ErrorDistribution::from_errors(errors),
            );
        }
    }
    entries
}

fn tournament(c: &mut Criterion) {
    let mut group = c.benchmark_group("tournament");
    for points in [1_000, 20_000] {
        let entries = entries(points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &entries, |b, e| {
            b.iter(|| run_tournament(black_box("S1"), e))
        });
    }
    group.finish();
}

fn distribution(c: &mut Criterion) {
    let errors: Vec<f64> = (0..50_000).map(|k| ((k * 7919) % 10_007) as f64).collect();
    c.bench_function("from_errors_50k", |b| {
        b.iter(|| ErrorDistribution::from_errors(black_box(errors.clone())))
    });
}

criterion_group!(
    name = ranking;
    config = Criterion::default().sample_size(20);
    targets = tournament, distribution
);
criterion_main!(ranking);
