//! The persisted and served unit: a plain vector index or a text index.

use crate::cluster::{ClusterIndex, ClusterStats};
use crate::error::Result;
use crate::search::{QueryEngine, QueryResult};
use crate::text::TextIndex;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// An index together with whatever it needs to answer its kind of query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoredIndex {
    /// Caller-supplied vectors; queries are vectors.
    Vectors(ClusterIndex),
    /// Vectorized documents; queries may be text.
    Text(TextIndex),
}

impl Default for StoredIndex {
    fn default() -> Self {
        StoredIndex::Vectors(ClusterIndex::default())
    }
}

impl StoredIndex {
    pub fn cluster_index(&self) -> &ClusterIndex {
        match self {
            StoredIndex::Vectors(index) => index,
            StoredIndex::Text(text) => text.index(),
        }
    }

    pub fn text(&self) -> Option<&TextIndex> {
        match self {
            StoredIndex::Vectors(_) => None,
            StoredIndex::Text(text) => Some(text),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoredIndex::Vectors(_) => "vectors",
            StoredIndex::Text(_) => "text",
        }
    }

    pub fn len(&self) -> usize {
        self.cluster_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cluster_index().is_empty()
    }

    /// Vector search against either kind of index.
    pub fn search(&self, query: &Vector, k: usize, probe_count: usize) -> Result<QueryResult> {
        QueryEngine::new(self.cluster_index()).search(query, k, probe_count)
    }

    pub fn stats(&self) -> ClusterStats {
        self.cluster_index().stats()
    }
}

impl From<ClusterIndex> for StoredIndex {
    fn from(index: ClusterIndex) -> Self {
        StoredIndex::Vectors(index)
    }
}

impl From<TextIndex> for StoredIndex {
    fn from(index: TextIndex) -> Self {
        StoredIndex::Text(index)
    }
}
