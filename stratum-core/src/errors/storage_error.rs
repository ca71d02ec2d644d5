//! Persistence errors.

use super::error_code::{self, StratumErrorCode};

/// Errors from the SQLite layer and bundle file management.
///
/// `BundleNotFound` is the one recoverable kind: callers distinguish
/// "not yet indexed" from true I/O failure with [`StorageError::is_not_found`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Encoding failed: {message}")]
    Encoding { message: String },

    #[error("No bundle for {repository}@{commit}")]
    BundleNotFound { repository: String, commit: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::BundleNotFound { .. })
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io {
            message: e.to_string(),
        }
    }
}

impl StratumErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            StorageError::BundleNotFound { .. } => error_code::BUNDLE_NOT_FOUND,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
