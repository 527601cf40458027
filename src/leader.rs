//! Leader selection: a seeded random sample of ids that anchor the clusters.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, TntError};

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 42;

/// Picks leaders by uniform sampling without replacement.
#[derive(Debug, Clone, Copy)]
pub struct LeaderSelector {
    seed: u64,
}

impl Default for LeaderSelector {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl LeaderSelector {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `ceil(sqrt(n))`, the leader count balancing assignment cost against
    /// query-time pruning.
    pub fn default_count(n: usize) -> usize {
        let mut count = (n as f64).sqrt().ceil() as usize;
        // Guard against float rounding on large n.
        while count > 1 && (count - 1) * (count - 1) >= n {
            count -= 1;
        }
        while count * count < n {
            count += 1;
        }
        count.max(1)
    }

    /// Choose `count` distinct ids out of `0..n`, returned in ascending order.
    pub fn select(&self, n: usize, count: usize) -> Result<Vec<usize>> {
        if n == 0 {
            return Err(TntError::EmptyCorpus);
        }
        if count < 1 || count > n {
            return Err(TntError::config(format!(
                "leader count {} outside [1, {}]",
                count, n
            )));
        }

        let mut leaders: Vec<usize> = if count == n {
            (0..n).collect()
        } else {
            let mut rng = StdRng::seed_from_u64(self.seed);
            rand::seq::index::sample(&mut rng, n, count).into_vec()
        };
        leaders.sort_unstable();
        Ok(leaders)
    }
}
