//! # tnt_search
//!
//! Approximate k-nearest-neighbor search over unit vectors under cosine
//! similarity, using cluster pruning.
//!
//! A build samples `ceil(sqrt(N))` leaders and assigns every vector to its most
//! similar leader. A query compares against the leaders only, then ranks the
//! members of the best `probe_count` clusters exactly.
//!
//! This library provides:
//! - Dense and sparse unit vectors with cosine similarity
//! - Seeded leader selection and parallel cluster assignment
//! - Pruned and exhaustive top-k search
//! - Bag-of-words text vectorization (counts or tf-idf)
//! - Snapshot persistence and a copy-and-swap handle for live rebuilds
//!
//! ## Example
//!
//! ```rust
//! use tnt_search::{build, query, BuildConfig, Vector};
//!
//! let vectors = vec![
//!     Vector::dense(vec![1.0, 0.0]),
//!     Vector::dense(vec![0.0, 1.0]),
//!     Vector::dense(vec![0.6, 0.8]),
//! ];
//! let index = build(vectors, &BuildConfig::default().with_seed(7)).unwrap();
//!
//! let result = query(&index, &Vector::dense(vec![1.0, 0.0]), 1, Some(2)).unwrap();
//! assert_eq!(result.hits()[0].id, 0);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod handle;
pub mod leader;
pub mod metrics;
pub mod neighbor_queue;
pub mod persistence;
pub mod search;
pub mod server;
pub mod space;
pub mod storage;
pub mod text;
pub mod vector;

pub use cluster::{CancellationToken, ClusterIndex, ClusterStats, Leader};
pub use config::{BuildConfig, IndexConfig, SearchDefaults};
pub use error::{Result, TntError};
pub use handle::IndexHandle;
pub use leader::{LeaderSelector, DEFAULT_SEED};
pub use search::{Hit, QueryEngine, QueryResult, DEFAULT_PROBE_COUNT};
pub use space::{Representation, VectorSpace};
pub use storage::StoredIndex;
pub use text::{BagOfWords, TextHit, TextIndex, Vectorizer, Weighting};
pub use vector::{SparseVector, Vector};

/// Build an index: select leaders per `config`, then assign every vector.
pub fn build(vectors: Vec<Vector>, config: &BuildConfig) -> Result<ClusterIndex> {
    build_with_cancel(vectors, config, &CancellationToken::new())
}

/// [`build`] with a cancellation token checked between assignment shards.
pub fn build_with_cancel(
    vectors: Vec<Vector>,
    config: &BuildConfig,
    cancel: &CancellationToken,
) -> Result<ClusterIndex> {
    if vectors.is_empty() {
        return Err(TntError::EmptyCorpus);
    }
    let n = vectors.len();
    let count = config
        .leader_count
        .unwrap_or_else(|| LeaderSelector::default_count(n));
    let leaders = LeaderSelector::new(config.effective_seed()).select(n, count)?;
    ClusterIndex::build_with(vectors, &leaders, config, cancel)
}

/// Top-k search probing `probe_count` clusters (default 1).
pub fn query(
    index: &ClusterIndex,
    vector: &Vector,
    k: usize,
    probe_count: Option<usize>,
) -> Result<QueryResult> {
    QueryEngine::new(index).search(vector, k, probe_count.unwrap_or(DEFAULT_PROBE_COUNT))
}
