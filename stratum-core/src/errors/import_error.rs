//! Import errors: the aggregate over one upload.

use super::error_code::{self, StratumErrorCode};
use super::{ParseError, StorageError, StructuralError};

/// Any failure during one upload. Aggregates subsystem errors via
/// `From` conversions. Every variant except the wrapped
/// `StorageError::BundleNotFound` is fatal and aborts the enclosing
/// transaction, leaving no partial bundle file.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Dump stream ended without a metadata vertex")]
    MissingMetadata,
}

impl StratumErrorCode for ImportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.error_code(),
            Self::Structural(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::MissingMetadata => error_code::MISSING_METADATA,
        }
    }
}
