//! Benchmarks for index construction

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tnt_search::{build, BuildConfig, Representation, Vector};

fn create_random_vectors(n: usize, dim: usize) -> Vec<Vector> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
            Vector::dense(data)
        })
        .collect()
}

fn create_sparse_vectors(n: usize, dim: usize, nnz: usize) -> Vec<Vector> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            let mut data = vec![0.0f32; dim];
            for _ in 0..nnz {
                data[rng.gen_range(0..dim)] = rng.gen_range(0.1f32..1.0);
            }
            Vector::dense(data)
        })
        .collect()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for size in [1_000, 10_000].iter() {
        let dense = create_random_vectors(*size, 128);
        group.bench_with_input(BenchmarkId::new("dense_128", size), size, |b, _| {
            b.iter(|| build(dense.clone(), &BuildConfig::default()).unwrap())
        });

        let sparse = create_sparse_vectors(*size, 5_000, 20);
        let config = BuildConfig::default().with_representation(Representation::Sparse);
        group.bench_with_input(BenchmarkId::new("sparse_5000", size), size, |b, _| {
            b.iter(|| build(sparse.clone(), &config).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build);
criterion_main!(benches);
