//! Shared utilities for OpsDesk crates: logging bootstrap and layered configuration.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
