//! Layered configuration loading
//!
//! Every OpsDesk component resolves its configuration the same way:
//! serialized defaults, then a TOML file, then `PREFIX_`-prefixed environment
//! variables (nested keys separated by `__`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The merged configuration could not be parsed into the target type
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    /// A value parsed but is not acceptable
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Loader implemented by each configuration root
pub trait ConfigLoader<T> {
    /// Load from `path`, or from the component's default file when `None`
    fn load(path: Option<PathBuf>) -> Result<T, ConfigurationError>;

    /// Load from an explicit file
    fn load_from_file(path: &Path) -> Result<T, ConfigurationError>;

    /// Re-apply environment overrides on top of an existing value
    fn apply_env_overrides(config: &mut T, prefix: &str) -> Result<(), ConfigurationError>;
}

/// Build the standard figment stack for `T`.
pub fn layered<T: Serialize + Default>(file: &Path, env_prefix: &str) -> Figment {
    debug!(
        file = %file.display(),
        env_prefix,
        exists = file.exists(),
        "Resolving configuration"
    );
    Figment::from(Serialized::defaults(T::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(env_prefix).split("__"))
}

/// Extract `T` from a figment, mapping errors to [`ConfigurationError`].
pub fn extract<T: DeserializeOwned>(figment: Figment) -> Result<T, ConfigurationError> {
    figment.extract().map_err(|e| ConfigurationError::ParseError {
        details: e.to_string(),
    })
}

/// Merge environment overrides into an already-loaded value.
pub fn merge_env<T: Serialize + DeserializeOwned>(
    config: &T,
    env_prefix: &str,
) -> Result<T, ConfigurationError> {
    extract(Figment::from(Serialized::defaults(config)).merge(Env::prefixed(env_prefix).split("__")))
}
