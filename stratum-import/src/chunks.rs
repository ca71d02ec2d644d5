//! Result sharding.
//!
//! Definition and reference results are spread over a fixed number of
//! chunk rows so a lookup touches one bounded blob instead of one
//! giant one. The shard for a result id is a pure function of the id,
//! so any reader can recompute it without consulting an index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratum_core::errors::StructuralError;
use stratum_core::protocol::Id;
use xxhash_rust::xxh3::xxh3_64;

use crate::correlator::Correlator;

/// Shard count written into every bundle's meta row. Readers must use
/// the persisted value, not this constant, when locating a result.
pub const NUM_RESULT_CHUNKS: usize = 50;

/// A (document, range) pair realizing a definition or reference
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedRange {
    pub document_id: Id,
    pub range_id: Id,
}

/// Encoded payload of one `result_chunks` row.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultChunkData {
    /// Document id -> path, covering exactly the documents referenced
    /// by `qualified_ranges` in this chunk.
    pub document_paths: BTreeMap<String, String>,
    /// Result id -> locations realizing it.
    pub qualified_ranges: BTreeMap<String, Vec<QualifiedRange>>,
}

/// The shard index for a result id. Stable across runs and platforms.
pub fn stable_hash(id: &Id, num_chunks: usize) -> usize {
    (xxh3_64(&id.hash_bytes()) % num_chunks as u64) as usize
}

/// Distribute every definition and reference result over `num_chunks`
/// shards. Chunks with no results stay empty and are still written, so
/// readers can rely on the row existing.
pub fn chunk_results(
    correlator: &Correlator,
    num_chunks: usize,
) -> Result<Vec<ResultChunkData>, StructuralError> {
    let mut chunks: Vec<ResultChunkData> = Vec::with_capacity(num_chunks);
    chunks.resize_with(num_chunks, ResultChunkData::default);

    for per_result in [&correlator.definition_data, &correlator.reference_data] {
        let mut result_ids: Vec<&Id> = per_result.keys().collect();
        result_ids.sort();

        for result_id in result_ids {
            let chunk = &mut chunks[stable_hash(result_id, num_chunks)];

            let per_document = &per_result[result_id];
            let mut document_ids: Vec<&Id> = per_document.keys().collect();
            document_ids.sort();

            let mut locations = Vec::new();
            for document_id in document_ids {
                let path = correlator.document_path(document_id)?;
                chunk
                    .document_paths
                    .insert(document_id.as_key(), path.to_owned());
                for range_id in &per_document[document_id] {
                    locations.push(QualifiedRange {
                        document_id: document_id.clone(),
                        range_id: range_id.clone(),
                    });
                }
            }
            chunk.qualified_ranges.insert(result_id.as_key(), locations);
        }
    }
    Ok(chunks)
}
