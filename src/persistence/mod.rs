//! Persistence layer: checksummed index snapshots.

pub mod serialization;
pub mod snapshot;

pub use snapshot::{Manifest, SnapshotManager};
