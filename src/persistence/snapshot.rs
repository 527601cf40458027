//! Snapshot: save/load a full index to/from a directory.
//!
//! `index.bin` layout: `[magic: 4][version: u32][crc32: u32][payload: bincode]`,
//! integers little-endian. `manifest.json` carries a human-readable summary.

use crate::error::{Result, TntError};
use crate::persistence::serialization;
use crate::storage::StoredIndex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MAGIC: &[u8; 4] = b"TNTX";
const FORMAT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 12;

/// Human-readable description of a saved snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub kind: String,
    pub vector_count: usize,
    pub leader_count: usize,
    pub dimension: usize,
    pub representation: String,
    pub checksum: u32,
}

/// Manages saving and loading index snapshots.
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    /// Create a snapshot manager for the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join("index.bin")
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Save an index. `index.bin` is replaced by rename, never written in place.
    pub fn save(&self, stored: &StoredIndex) -> Result<Manifest> {
        if stored.is_empty() {
            return Err(TntError::EmptyIndex);
        }

        let payload = serialization::to_bincode(stored)?;
        let checksum = crc32fast::hash(&payload);

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        data.extend_from_slice(&checksum.to_le_bytes());
        data.extend_from_slice(&payload);

        let tmp = self.snapshot_path().with_extension("bin.tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, self.snapshot_path())?;

        let index = stored.cluster_index();
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            kind: stored.kind().to_string(),
            vector_count: index.len(),
            leader_count: index.leaders().len(),
            dimension: index.dimension(),
            representation: index.space().representation().to_string(),
            checksum,
        };
        fs::write(self.manifest_path(), serialization::to_json(&manifest)?)?;

        info!(
            path = %self.snapshot_path().display(),
            bytes = data.len(),
            vectors = manifest.vector_count,
            "saved index snapshot"
        );
        Ok(manifest)
    }

    /// Load an index, or return None if no snapshot exists.
    pub fn load(&self) -> Result<Option<StoredIndex>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)?;
        if data.len() < HEADER_SIZE {
            return Err(TntError::corrupt("snapshot shorter than its header"));
        }
        if &data[0..4] != MAGIC {
            return Err(TntError::corrupt("not an index snapshot"));
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != FORMAT_VERSION {
            return Err(TntError::corrupt(format!(
                "unsupported snapshot format version {}",
                version
            )));
        }
        let expected = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let payload = &data[HEADER_SIZE..];
        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(TntError::corrupt(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        let stored: StoredIndex = serialization::from_bincode(payload)
            .map_err(|e| TntError::corrupt(e.to_string()))?;
        info!(
            path = %path.display(),
            kind = stored.kind(),
            vectors = stored.len(),
            "loaded index snapshot"
        );
        Ok(Some(stored))
    }

    /// Read the manifest, or None if none was written.
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(serialization::from_json(&bytes)?))
    }

    /// Check if a snapshot exists.
    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }
}
