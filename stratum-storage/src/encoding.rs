//! Encoded payloads for documents and result chunks.
//!
//! JSON via serde. Determinism matters more than compactness here: the
//! import pipeline promises byte-identical bundles for identical dumps,
//! so every map that reaches this encoder is a `BTreeMap` and every set
//! a sorted vector. Compression is deliberately left out; payloads stay
//! inspectable with stock tooling.

use serde::de::DeserializeOwned;
use serde::Serialize;
use stratum_core::errors::StorageError;

/// Encode a payload to bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Encoding {
        message: e.to_string(),
    })
}

/// Decode a payload produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Encoding {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn round_trips_and_is_deterministic() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), vec![2, 3]);
        map.insert("a".to_string(), vec![1]);

        let one = encode(&map).unwrap();
        let two = encode(&map).unwrap();
        assert_eq!(one, two);

        let back: BTreeMap<String, Vec<i32>> = decode(&one).unwrap();
        assert_eq!(back, map);
    }
}
