//! Stable error codes, one per failure class.
//! Codes cross process boundaries (logs, API payloads) and must never
//! change once released.

pub const PARSE_ERROR: &str = "STRATUM_PARSE_ERROR";
pub const STRUCTURAL_ERROR: &str = "STRATUM_STRUCTURAL_ERROR";
pub const MISSING_METADATA: &str = "STRATUM_MISSING_METADATA";
pub const STORAGE_ERROR: &str = "STRATUM_STORAGE_ERROR";
pub const BUNDLE_NOT_FOUND: &str = "STRATUM_BUNDLE_NOT_FOUND";
pub const CONFIG_ERROR: &str = "STRATUM_CONFIG_ERROR";

/// Maps every error variant to a stable string code.
pub trait StratumErrorCode {
    fn error_code(&self) -> &'static str;
}
