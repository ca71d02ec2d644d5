//! Graph structure errors.

use super::error_code::{self, StratumErrorCode};
use crate::protocol::Id;

/// A relation in the dump referenced an id that was never defined, or a
/// vertex is missing required companion data. Detected lazily, at
/// canonicalization or assembly time, because forward references are
/// legal in the stream.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("Relation {relation:?} references unknown id {id}")]
    MissingReference { relation: &'static str, id: Id },

    #[error("Moniker {moniker_id} has kind {kind:?} but no package information")]
    MissingPackageInformation { moniker_id: Id, kind: &'static str },
}

impl StratumErrorCode for StructuralError {
    fn error_code(&self) -> &'static str {
        error_code::STRUCTURAL_ERROR
    }
}
