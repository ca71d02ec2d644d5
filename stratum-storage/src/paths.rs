//! Bundle file naming and lookup.

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use stratum_core::errors::StorageError;

/// Compute the bundle filename for a (repository, commit) pair.
///
/// The repository name is percent-encoded so path separators cannot
/// escape the storage root; commits are revision hashes and used as-is.
pub fn bundle_path(root: &Path, repository: &str, commit: &str) -> PathBuf {
    let encoded = utf8_percent_encode(repository, NON_ALPHANUMERIC);
    root.join(format!("{encoded}@{commit}.db"))
}

/// Existence check driving NotFound semantics: absence of the file
/// means the commit was never successfully uploaded.
pub fn find_bundle(root: &Path, repository: &str, commit: &str) -> Result<PathBuf, StorageError> {
    let path = bundle_path(root, repository, commit);
    if path.is_file() {
        Ok(path)
    } else {
        Err(StorageError::BundleNotFound {
            repository: repository.to_string(),
            commit: commit.to_string(),
        })
    }
}
