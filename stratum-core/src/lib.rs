//! # stratum-core
//!
//! Shared foundation for the Stratum code-intelligence importer:
//! - Protocol: the closed vertex/edge model of the dump line format
//! - Errors: one enum per subsystem, `thiserror` only, zero `anyhow`
//! - Config: TOML-based configuration with env overrides

pub mod config;
pub mod errors;
pub mod protocol;
