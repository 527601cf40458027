//! Query engine: leader pruning followed by exact ranking of the probed clusters.

use serde::Serialize;
use tracing::debug;

use crate::cluster::ClusterIndex;
use crate::error::{Result, TntError};
use crate::neighbor_queue::{Scored, TopK};
use crate::vector::Vector;

/// Number of clusters searched when the caller does not say otherwise.
pub const DEFAULT_PROBE_COUNT: usize = 1;

/// A single search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub id: usize,
    pub score: f32,
}

/// Hits ordered by descending score, ascending id on ties.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryResult {
    hits: Vec<Hit>,
    /// Number of vectors scored exactly to produce `hits`.
    candidates: usize,
}

impl QueryResult {
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn ids(&self) -> Vec<usize> {
        self.hits.iter().map(|h| h.id).collect()
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }
}

impl IntoIterator for QueryResult {
    type Item = Hit;
    type IntoIter = std::vec::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Read-only search over a built [`ClusterIndex`].
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    index: &'a ClusterIndex,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a ClusterIndex) -> Self {
        Self { index }
    }

    /// Approximate top-k: score the leaders, search the best `probe_count`
    /// clusters exactly.
    ///
    /// `probe_count` is clamped to the number of leaders; probing every
    /// cluster makes the result exact.
    pub fn search(&self, query: &Vector, k: usize, probe_count: usize) -> Result<QueryResult> {
        let (query, k) = self.validate(query, k)?;
        if probe_count < 1 {
            return Err(TntError::argument("probe_count must be at least 1"));
        }

        let probed = self.rank_leaders(&query, probe_count);
        let space = self.index.space();

        let mut top = TopK::new(k);
        let mut candidates = 0;
        for leader in &probed {
            let members = self.index.members(leader.id).unwrap_or_default();
            candidates += members.len();
            for &id in members {
                let score = space.similarity(&query, &self.index.vectors()[id]);
                top.push(Scored::new(id, score));
            }
        }

        debug!(
            probed = probed.len(),
            best_leader = probed.first().map(|s| s.id),
            candidates,
            k,
            "pruned search"
        );

        Ok(finish(top, candidates))
    }

    /// Exact top-k over every indexed vector.
    pub fn exhaustive(&self, query: &Vector, k: usize) -> Result<QueryResult> {
        let (query, k) = self.validate(query, k)?;
        let space = self.index.space();

        let mut top = TopK::new(k);
        for (id, v) in self.index.vectors().iter().enumerate() {
            top.push(Scored::new(id, space.similarity(&query, v)));
        }
        Ok(finish(top, self.index.len()))
    }

    /// The `probe_count` leaders most similar to `query`, best first.
    pub fn probe(&self, query: &Vector, probe_count: usize) -> Result<Vec<Scored>> {
        if self.index.is_empty() {
            return Err(TntError::EmptyIndex);
        }
        let query = self.index.space().prepare(query)?;
        Ok(self.rank_leaders(&query, probe_count))
    }

    /// `query` must already be prepared for the index's space.
    fn rank_leaders(&self, query: &Vector, probe_count: usize) -> Vec<Scored> {
        let space = self.index.space();
        let mut top = TopK::new(probe_count.min(self.index.leaders().len()));
        for leader in self.index.leader_ids() {
            top.push(Scored::new(
                leader,
                space.similarity(query, &self.index.vectors()[leader]),
            ));
        }
        top.into_sorted_vec()
    }

    /// Check the query and clamp `k` to the corpus size.
    fn validate(&self, query: &Vector, k: usize) -> Result<(Vector, usize)> {
        if self.index.is_empty() {
            return Err(TntError::EmptyIndex);
        }
        let query = self.index.space().prepare(query)?;
        if k < 1 {
            return Err(TntError::argument("k must be at least 1"));
        }
        Ok((query, k.min(self.index.len())))
    }
}

fn finish(top: TopK, candidates: usize) -> QueryResult {
    let hits = top
        .into_sorted_vec()
        .into_iter()
        .map(|s| Hit {
            id: s.id,
            score: s.score,
        })
        .collect();
    QueryResult { hits, candidates }
}
