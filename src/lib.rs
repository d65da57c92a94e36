//! Library exports for reusing snipkeep subsystems.
//!
//! Exposes the capture pipeline and configuration so the main binary, the schema
//! dumper, and integration tests share one implementation.

pub mod capture;
pub mod config;
pub mod daemon;

pub use config::Config;
