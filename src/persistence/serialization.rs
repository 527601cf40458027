//! Serialization utilities: bincode for the index payload, JSON for the manifest.

use crate::error::{Result, TntError};
use serde::{Deserialize, Serialize};

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| TntError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| TntError::SerializationError(e.to_string()))
}

/// Encode data to pretty-printed JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| TntError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| TntError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterIndex;
    use crate::storage::StoredIndex;
    use crate::vector::Vector;

    fn stored() -> StoredIndex {
        let vectors = vec![
            Vector::dense(vec![1.0, 0.0]),
            Vector::dense(vec![0.0, 1.0]),
            Vector::dense(vec![0.6, 0.8]),
        ];
        ClusterIndex::build(vectors, &[0, 1]).unwrap().into()
    }

    #[test]
    fn test_bincode_stored_index() {
        let bytes = to_bincode(&stored()).unwrap();
        let decoded: StoredIndex = from_bincode(&bytes).unwrap();
        let index = decoded.cluster_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index.leader_ids().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.leader_of(2), Some(1));
    }

    #[test]
    fn test_truncated_bincode_is_an_error() {
        let bytes = to_bincode(&stored()).unwrap();
        let result: Result<StoredIndex> = from_bincode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(TntError::SerializationError(_))));
    }
}
