//! Error handling for Stratum.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod error_code;
pub mod import_error;
pub mod parse_error;
pub mod storage_error;
pub mod structural_error;

pub use config_error::ConfigError;
pub use error_code::StratumErrorCode;
pub use import_error::ImportError;
pub use parse_error::ParseError;
pub use storage_error::StorageError;
pub use structural_error::StructuralError;
