//! Bounded top-k selection over scored ids, with a total order on f32 scores for BinaryHeap.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// An id with its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub id: usize,
    pub score: f32,
}

impl Scored {
    pub fn new(id: usize, score: f32) -> Self {
        Self { id, score }
    }

    /// Rank order: higher score first, lower id first among equal scores.
    pub fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

// Greater means better: a max-heap of `Scored` pops the best entry, a
// max-heap of `Reverse<Scored>` pops the worst.
impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank(self)
    }
}

/// Keeps the `limit` best entries seen so far, worst entry on top.
pub struct TopK {
    heap: BinaryHeap<Reverse<Scored>>,
    limit: usize,
}

impl TopK {
    pub fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.saturating_add(1).min(1 << 16)),
            limit,
        }
    }

    /// Offer an entry; it is kept only if it beats the current worst.
    pub fn push(&mut self, s: Scored) {
        if self.limit == 0 {
            return;
        }
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(s));
            return;
        }
        if let Some(Reverse(worst)) = self.heap.peek() {
            if s > *worst {
                self.heap.pop();
                self.heap.push(Reverse(s));
            }
        }
    }

    /// The worst entry currently kept.
    pub fn peek_worst(&self) -> Option<&Scored> {
        self.heap.peek().map(|r| &r.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into rank order (best first).
    pub fn into_sorted_vec(self) -> Vec<Scored> {
        let mut v: Vec<Scored> = self.heap.into_iter().map(|r| r.0).collect();
        v.sort_by(Scored::rank);
        v
    }
}
