//! Build and search configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TntError};
use crate::leader::DEFAULT_SEED;
use crate::space::Representation;

/// Vectors assigned per rayon task during the build's assignment pass.
pub const DEFAULT_SHARD_SIZE: usize = 1024;

/// Configuration for building a cluster index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of leaders. Defaults to `ceil(sqrt(N))`.
    pub leader_count: Option<usize>,
    /// Seed for leader sampling. Defaults to [`DEFAULT_SEED`].
    pub seed: Option<u64>,
    /// Force a storage representation instead of choosing from corpus density.
    pub representation: Option<Representation>,
    /// Vectors per assignment shard; cancellation is checked between shards.
    pub shard_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            leader_count: None,
            seed: None,
            representation: None,
            shard_size: DEFAULT_SHARD_SIZE,
        }
    }
}

impl BuildConfig {
    pub fn with_leader_count(mut self, count: usize) -> Self {
        self.leader_count = Some(count);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = Some(representation);
        self
    }

    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.shard_size == 0 {
            return Err(TntError::config("shard_size must be at least 1"));
        }
        Ok(())
    }
}

/// Defaults applied to queries that do not specify `k` or `probe_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub k: usize,
    pub probe_count: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            k: 10,
            probe_count: 1,
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub build: BuildConfig,
    pub search: SearchDefaults,
}

impl IndexConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| TntError::SerializationError(e.to_string()))
    }
}
