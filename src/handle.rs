//! Copy-and-swap handle for serving an index while rebuilds happen.
//!
//! Readers take an `Arc` snapshot and keep it for the whole query; a rebuild
//! constructs the replacement off-lock and swaps the pointer. Readers see the
//! old index or the new one, never a partial build.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

/// Atomically swappable, generation-tagged shared value.
#[derive(Debug)]
pub struct IndexHandle<T> {
    current: RwLock<Arc<T>>,
    generation: AtomicU64,
}

impl<T> IndexHandle<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
            generation: AtomicU64::new(0),
        }
    }

    /// The active value. The returned `Arc` stays valid across later swaps.
    pub fn load(&self) -> Arc<T> {
        // The lock only guards a pointer copy, so a poisoned lock still holds a
        // complete value.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// The active value with the generation it was installed at.
    pub fn load_tagged(&self) -> (Arc<T>, u64) {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        // Swaps bump the generation while holding the write lock.
        (Arc::clone(&guard), self.generation.load(Ordering::Acquire))
    }

    /// Replace the active value and return the new generation number.
    pub fn swap(&self, value: T) -> u64 {
        let next = Arc::new(value);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        drop(guard);
        info!(generation, "swapped active index");
        generation
    }

    /// Number of swaps since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T: Default> Default for IndexHandle<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
