//! # stratum-storage
//!
//! SQLite persistence for Stratum bundles and the cross-repository
//! index: pragmas, the transactional connection provider, the bundle
//! schema, parameter-bounded batch inserts, deterministic payload
//! encoding, and bundle file naming.

pub mod connection;
pub mod encoding;
pub mod inserter;
pub mod paths;
pub mod schema;
pub mod xrepo;

pub use connection::{open_readonly, with_connection};
pub use inserter::{BatchInserter, MAX_BOUND_PARAMETERS};
pub use xrepo::XrepoStore;
