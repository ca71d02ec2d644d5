//! # stratum-import
//!
//! Compiles a streamed code-intelligence dump for one
//! (repository, commit) into a query-efficient SQLite bundle plus a
//! package manifest for the cross-repository index.
//!
//! The pipeline is a single sequential pass:
//! stream -> [`Correlator`] -> [`canonicalize`] -> {document assembly,
//! result chunking, row projection} -> bundle; package extraction ->
//! xrepo index. The [`Backend`] sequences the stages inside one
//! transaction per commit.

pub mod backend;
pub mod canonicalize;
pub mod chunks;
pub mod correlator;
pub mod document;
pub mod packages;
pub mod rows;

pub use backend::{Backend, BundleHandle, BundleMeta, UploadStats, BUNDLE_FORMAT_VERSION};
pub use canonicalize::{canonicalize_all, reachable_monikers};
pub use chunks::NUM_RESULT_CHUNKS;
pub use correlator::Correlator;
