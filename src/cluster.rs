//! Cluster index: leaders, their members, and the id -> leader assignment.
//!
//! Built once from a batch of vectors and immutable afterwards. Every vector
//! belongs to exactly one cluster, and each leader is a member of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{Result, TntError};
use crate::space::{Representation, VectorSpace, UNIT_NORM_TOLERANCE};
use crate::vector::Vector;

/// Cooperative cancellation flag for long builds, checked between shards.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A leader and the ascending ids of its cluster (the leader included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    id: usize,
    members: Vec<usize>,
}

impl Leader {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Cluster size summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStats {
    pub vectors: usize,
    pub clusters: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
}

/// The built index.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawClusterIndex")]
pub struct ClusterIndex {
    space: VectorSpace,
    vectors: Vec<Vector>,
    /// Ascending by leader id.
    leaders: Vec<Leader>,
    /// Vector id -> leader id.
    assignment: Vec<usize>,
}

impl Default for ClusterIndex {
    /// An empty, unbuilt index. Queries against it fail with `EmptyIndex`.
    fn default() -> Self {
        Self {
            space: VectorSpace::new(0, Representation::Dense),
            vectors: Vec::new(),
            leaders: Vec::new(),
            assignment: Vec::new(),
        }
    }
}

impl ClusterIndex {
    /// Build an index around the given leader ids with default settings.
    pub fn build(vectors: Vec<Vector>, leader_ids: &[usize]) -> Result<Self> {
        Self::build_with(
            vectors,
            leader_ids,
            &BuildConfig::default(),
            &CancellationToken::new(),
        )
    }

    /// Build an index around the given leader ids.
    ///
    /// Only `representation` and `shard_size` are read from `config`; leader
    /// choice has already happened.
    pub fn build_with(
        vectors: Vec<Vector>,
        leader_ids: &[usize],
        config: &BuildConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        if vectors.is_empty() {
            return Err(TntError::EmptyCorpus);
        }
        let start = Instant::now();

        let dimension = vectors[0].dimension();
        let representation = config
            .representation
            .unwrap_or_else(|| Representation::choose(&vectors, dimension));
        let space = VectorSpace::new(dimension, representation);

        let vectors = vectors
            .iter()
            .enumerate()
            .map(|(id, v)| space.prepare(v).map_err(|e| with_vector_id(e, id)))
            .collect::<Result<Vec<_>>>()?;

        let leader_ids = validate_leaders(leader_ids, vectors.len())?;
        let assignment = assign(&space, &vectors, &leader_ids, config.shard_size, cancel)?;
        let leaders = group_members(&leader_ids, &assignment);

        info!(
            vectors = vectors.len(),
            leaders = leaders.len(),
            dimension,
            representation = %representation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built cluster index"
        );

        Ok(Self {
            space,
            vectors,
            leaders,
            assignment,
        })
    }

    /// Restore a persisted index verbatim, validating every invariant.
    pub fn from_parts(
        space: VectorSpace,
        vectors: Vec<Vector>,
        leader_ids: Vec<usize>,
        assignment: Vec<usize>,
    ) -> Result<Self> {
        if vectors.is_empty() {
            return Err(TntError::corrupt("index holds no vectors"));
        }
        for (id, v) in vectors.iter().enumerate() {
            if v.dimension() != space.dimension() {
                return Err(TntError::corrupt(format!(
                    "vector {} has dimension {}, index has {}",
                    id,
                    v.dimension(),
                    space.dimension()
                )));
            }
            if v.is_sparse() != (space.representation() == Representation::Sparse) {
                return Err(TntError::corrupt(format!(
                    "vector {} is not stored as {}",
                    id,
                    space.representation()
                )));
            }
            if !v.is_finite() || (v.norm() - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(TntError::corrupt(format!("vector {} is not unit-norm", id)));
            }
        }

        if leader_ids.is_empty() || leader_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TntError::corrupt("leader ids must be non-empty and ascending"));
        }
        if leader_ids.last().is_some_and(|&last| last >= vectors.len()) {
            return Err(TntError::corrupt("leader id out of range"));
        }
        if assignment.len() != vectors.len() {
            return Err(TntError::corrupt(format!(
                "assignment covers {} of {} vectors",
                assignment.len(),
                vectors.len()
            )));
        }
        for (id, &leader) in assignment.iter().enumerate() {
            if leader_ids.binary_search(&leader).is_err() {
                return Err(TntError::corrupt(format!(
                    "vector {} assigned to non-leader {}",
                    id, leader
                )));
            }
        }
        for &leader in &leader_ids {
            if assignment[leader] != leader {
                return Err(TntError::corrupt(format!(
                    "leader {} is not a member of its own cluster",
                    leader
                )));
            }
        }

        let leaders = group_members(&leader_ids, &assignment);
        Ok(Self {
            space,
            vectors,
            leaders,
            assignment,
        })
    }

    pub fn space(&self) -> &VectorSpace {
        &self.space
    }

    pub fn dimension(&self) -> usize {
        self.space.dimension()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vector(&self, id: usize) -> Option<&Vector> {
        self.vectors.get(id)
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    pub fn leaders(&self) -> &[Leader] {
        &self.leaders
    }

    pub fn leader_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.leaders.iter().map(Leader::id)
    }

    /// Members of the cluster led by `leader_id`, or `None` if it is not a leader.
    pub fn members(&self, leader_id: usize) -> Option<&[usize]> {
        self.leaders
            .binary_search_by_key(&leader_id, Leader::id)
            .ok()
            .map(|slot| self.leaders[slot].members())
    }

    /// The leader owning vector `id`.
    pub fn leader_of(&self, id: usize) -> Option<usize> {
        self.assignment.get(id).copied()
    }

    pub fn stats(&self) -> ClusterStats {
        let sizes = self.leaders.iter().map(Leader::len);
        let clusters = self.leaders.len();
        ClusterStats {
            vectors: self.vectors.len(),
            clusters,
            min_size: sizes.clone().min().unwrap_or(0),
            max_size: sizes.max().unwrap_or(0),
            mean_size: if clusters == 0 {
                0.0
            } else {
                self.vectors.len() as f64 / clusters as f64
            },
        }
    }
}

fn with_vector_id(err: TntError, id: usize) -> TntError {
    match err {
        TntError::DegenerateVector { reason } => {
            TntError::degenerate(format!("vector {}: {}", id, reason))
        }
        other => other,
    }
}

fn validate_leaders(leader_ids: &[usize], n: usize) -> Result<Vec<usize>> {
    if leader_ids.is_empty() {
        return Err(TntError::config("at least one leader is required"));
    }
    let mut sorted = leader_ids.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(TntError::config("leader ids must be distinct"));
    }
    if let Some(&last) = sorted.last() {
        if last >= n {
            return Err(TntError::config(format!(
                "leader id {} out of range for {} vectors",
                last, n
            )));
        }
    }
    Ok(sorted)
}

/// Nearest-leader assignment, sharded across rayon workers.
fn assign(
    space: &VectorSpace,
    vectors: &[Vector],
    leader_ids: &[usize],
    shard_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<usize>> {
    let mut is_leader = vec![false; vectors.len()];
    for &id in leader_ids {
        is_leader[id] = true;
    }
    let leader_vectors: Vec<(usize, &Vector)> =
        leader_ids.iter().map(|&id| (id, &vectors[id])).collect();

    let shards = vectors
        .par_chunks(shard_size)
        .enumerate()
        .map(|(shard, chunk)| {
            if cancel.is_cancelled() {
                return Err(TntError::Cancelled);
            }
            let base = shard * shard_size;
            let assigned: Vec<usize> = chunk
                .iter()
                .enumerate()
                .map(|(offset, v)| {
                    let id = base + offset;
                    if is_leader[id] {
                        id
                    } else {
                        nearest_leader(space, v, &leader_vectors)
                    }
                })
                .collect();
            Ok(assigned)
        })
        .collect::<Result<Vec<Vec<usize>>>>()?;

    debug!(shards = shards.len(), "assignment pass complete");
    Ok(shards.into_iter().flatten().collect())
}

/// Leader of maximum similarity; leaders are ascending so the first maximum
/// is the lowest id.
fn nearest_leader(space: &VectorSpace, v: &Vector, leaders: &[(usize, &Vector)]) -> usize {
    let mut best_id = leaders[0].0;
    let mut best_score = f32::NEG_INFINITY;
    for &(id, leader) in leaders {
        let score = space.similarity(v, leader);
        if score > best_score {
            best_score = score;
            best_id = id;
        }
    }
    best_id
}

fn group_members(leader_ids: &[usize], assignment: &[usize]) -> Vec<Leader> {
    let mut leaders: Vec<Leader> = leader_ids
        .iter()
        .map(|&id| Leader {
            id,
            members: Vec::new(),
        })
        .collect();
    for (id, &leader) in assignment.iter().enumerate() {
        if let Ok(slot) = leader_ids.binary_search(&leader) {
            leaders[slot].members.push(id);
        }
    }
    leaders
}

// --- Serialization: the three index fields, members are derived on load ---

#[derive(Serialize)]
struct RawClusterIndexRef<'a> {
    space: &'a VectorSpace,
    vectors: &'a [Vector],
    leaders: Vec<usize>,
    assignment: &'a [usize],
}

#[derive(Deserialize)]
struct RawClusterIndex {
    space: VectorSpace,
    vectors: Vec<Vector>,
    leaders: Vec<usize>,
    assignment: Vec<usize>,
}

impl Serialize for ClusterIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RawClusterIndexRef {
            space: &self.space,
            vectors: &self.vectors,
            leaders: self.leader_ids().collect(),
            assignment: &self.assignment,
        }
        .serialize(serializer)
    }
}

impl TryFrom<RawClusterIndex> for ClusterIndex {
    type Error = TntError;

    fn try_from(raw: RawClusterIndex) -> Result<Self> {
        ClusterIndex::from_parts(raw.space, raw.vectors, raw.leaders, raw.assignment)
    }
}
