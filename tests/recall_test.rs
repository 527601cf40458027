//! Recall tests: pruned search against a brute-force cosine ranking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tnt_search::{build, BuildConfig, ClusterIndex, QueryEngine, Vector};

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    dot / (na * nb)
}

/// Ids of the `k` most similar rows, best first.
fn brute_force(data: &[Vec<f32>], query: &[f32], k: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = data
        .iter()
        .enumerate()
        .map(|(id, v)| (id, cosine(v, query)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    scored.into_iter().take(k).map(|(id, _)| id).collect()
}

fn fixture(n: usize, dim: usize, seed: u64) -> (Vec<Vec<f32>>, ClusterIndex, Vec<Vec<f32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = random_vectors(&mut rng, n, dim);
    let queries = random_vectors(&mut rng, 20, dim);
    let vectors = data.iter().cloned().map(Vector::dense).collect();
    let index = build(vectors, &BuildConfig::default().with_seed(seed)).unwrap();
    (data, index, queries)
}

#[test]
fn test_all_probes_is_exact() {
    let (data, index, queries) = fixture(500, 16, 1);
    let engine = QueryEngine::new(&index);
    let all = index.leaders().len();
    assert_eq!(all, 23);

    for q in &queries {
        let result = engine.search(&Vector::dense(q.clone()), 10, all).unwrap();
        assert_eq!(result.ids(), brute_force(&data, q, 10));
        assert_eq!(result.candidates(), 500);
    }
}

#[test]
fn test_recall_grows_with_probes() {
    let (data, index, queries) = fixture(1000, 8, 2);
    let engine = QueryEngine::new(&index);
    let k = 10;
    let mut mean_recall = Vec::new();

    for probes in [1, 2, 4, 8, 16, 32] {
        let mut total = 0.0;
        for q in &queries {
            let truth: HashSet<usize> = brute_force(&data, q, k).into_iter().collect();
            let found = engine
                .search(&Vector::dense(q.clone()), k, probes)
                .unwrap()
                .ids()
                .into_iter()
                .filter(|id| truth.contains(id))
                .count();
            total += found as f64 / k as f64;
        }
        mean_recall.push(total / queries.len() as f64);
    }

    for pair in mean_recall.windows(2) {
        assert!(pair[1] >= pair[0], "recall decreased: {:?}", mean_recall);
    }
    assert_eq!(*mean_recall.last().unwrap(), 1.0);
}

#[test]
fn test_per_query_recall_is_monotone() {
    let (data, index, queries) = fixture(300, 12, 3);
    let engine = QueryEngine::new(&index);
    let leaders = index.leaders().len();

    for q in &queries {
        let truth: HashSet<usize> = brute_force(&data, q, 5).into_iter().collect();
        let query = Vector::dense(q.clone());
        let mut previous = 0;
        for probes in 1..=leaders {
            let found = engine
                .search(&query, 5, probes)
                .unwrap()
                .ids()
                .into_iter()
                .filter(|id| truth.contains(id))
                .count();
            assert!(found >= previous);
            previous = found;
        }
        assert_eq!(previous, 5);
    }
}
