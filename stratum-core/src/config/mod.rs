//! Configuration system for Stratum.
//! TOML-based, 3-layer resolution: env > project config > defaults.

pub mod storage_config;
pub mod stratum_config;

pub use storage_config::StorageConfig;
pub use stratum_config::StratumConfig;
