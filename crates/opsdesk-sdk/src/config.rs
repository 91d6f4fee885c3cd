//! SDK configuration
//!
//! Loaded through [`ConfigLoader`]: defaults, then `opsdesk.toml` (or an
//! explicit file), then `OPSDESK_*` environment variables, e.g.
//! `OPSDESK_API__BASE_URL` or `OPSDESK_SESSION__CHECK_INTERVAL_SECS`.

use crate::auth::lifecycle::{LifecycleSettings, DEFAULT_CHECK_INTERVAL};
use crate::auth::refresh::{RefreshSettings, DEFAULT_REFRESH_MARGIN, DEFAULT_TOKEN_TTL};
use crate::auth::routes;
use crate::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use opsdesk_common::config::{extract, layered, merge_env};
use opsdesk_common::{ConfigLoader, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "opsdesk.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "OPSDESK_";

/// Backend endpoint paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointConfig {
    pub login: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            refresh: "/refresh".to_string(),
            logout: "/logout".to_string(),
        }
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub endpoints: EndpointConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Refresh when the token expires within this many seconds
    pub refresh_margin_secs: u64,
    pub check_interval_secs: u64,
    /// Lifetime assumed when the backend omits `expires_in`
    pub default_token_ttl_secs: u64,
    pub public_routes: Vec<String>,
    pub login_route: String,
    pub home_route: String,
    pub login_redirect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN.as_secs(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL.as_secs(),
            default_token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
            public_routes: routes::DEFAULT_PUBLIC_ROUTES
                .iter()
                .map(|r| r.to_string())
                .collect(),
            login_route: routes::DEFAULT_LOGIN_ROUTE.to_string(),
            home_route: routes::DEFAULT_HOME_ROUTE.to_string(),
            login_redirect_delay_ms: 0,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SdkConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

impl SdkConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let config = match config_path {
            Some(path) => <SdkConfig as ConfigLoader<SdkConfig>>::load_from_file(path)?,
            None => <SdkConfig as ConfigLoader<SdkConfig>>::load(None)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigurationError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        url::Url::parse(&self.api.base_url).map_err(|e| ConfigurationError::InvalidValue {
            key: "api.base_url".to_string(),
            reason: e.to_string(),
        })?;

        for (key, value) in [
            ("api.timeout_secs", self.api.timeout_secs),
            ("session.check_interval_secs", self.session.check_interval_secs),
            ("session.default_token_ttl_secs", self.session.default_token_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigurationError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        for (key, route) in [
            ("session.login_route", &self.session.login_route),
            ("session.home_route", &self.session.home_route),
        ] {
            if !route.starts_with('/') {
                return Err(ConfigurationError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("'{route}' must start with '/'"),
                });
            }
        }
        Ok(())
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            endpoint: self.api.endpoints.refresh.clone(),
            default_ttl: Duration::from_secs(self.session.default_token_ttl_secs),
            margin: Duration::from_secs(self.session.refresh_margin_secs),
        }
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            login_endpoint: self.api.endpoints.login.clone(),
            logout_endpoint: self.api.endpoints.logout.clone(),
            check_interval: Duration::from_secs(self.session.check_interval_secs),
            public_routes: self.session.public_routes.clone(),
            login_route: self.session.login_route.clone(),
            home_route: self.session.home_route.clone(),
            login_redirect_delay: Duration::from_millis(self.session.login_redirect_delay_ms),
        }
    }
}

impl ConfigLoader<SdkConfig> for SdkConfig {
    fn load(path: Option<PathBuf>) -> Result<SdkConfig, ConfigurationError> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        extract(layered::<SdkConfig>(&path, ENV_PREFIX))
    }

    fn load_from_file(path: &Path) -> Result<SdkConfig, ConfigurationError> {
        extract(layered::<SdkConfig>(path, ENV_PREFIX))
    }

    fn apply_env_overrides(config: &mut SdkConfig, prefix: &str) -> Result<(), ConfigurationError> {
        *config = merge_env(config, prefix)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.session.check_interval_secs, 60);
        assert_eq!(config.session.refresh_margin_secs, 300);
        assert_eq!(config.api.endpoints.refresh, "/refresh");
        assert!(config.session.public_routes.contains(&"/students".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generate_example_parses_back() {
        let example = SdkConfig::generate_example().unwrap();
        let parsed: SdkConfig = toml::from_str(&example).unwrap();
        assert_eq!(parsed, SdkConfig::default());
    }

    #[test]
    fn test_file_and_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "opsdesk.toml",
                r#"
                [api]
                base_url = "https://ops.example.com/api"

                [session]
                check_interval_secs = 30
                login_redirect_delay_ms = 250
                "#,
            )?;
            jail.set_env("OPSDESK_API__TIMEOUT_SECS", "5");

            let config = SdkConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.api.base_url, "https://ops.example.com/api");
            assert_eq!(config.api.timeout_secs, 5);
            assert_eq!(config.session.check_interval_secs, 30);
            assert_eq!(config.session.login_route, "/login");

            let lifecycle = config.lifecycle_settings();
            assert_eq!(lifecycle.check_interval, Duration::from_secs(30));
            assert_eq!(lifecycle.login_redirect_delay, Duration::from_millis(250));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_on_loaded_value() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OPSDESK_TEST_SESSION__REFRESH_MARGIN_SECS", "120");
            let mut config = SdkConfig::default();
            SdkConfig::apply_env_overrides(&mut config, "OPSDESK_TEST_")
                .map_err(|e| e.to_string())?;
            assert_eq!(config.refresh_settings().margin, Duration::from_secs(120));
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SdkConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { key, .. }) if key == "api.base_url"
        ));

        let mut config = SdkConfig::default();
        config.session.check_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SdkConfig::default();
        config.session.login_route = "login".to_string();
        assert!(config.validate().is_err());
    }
}
