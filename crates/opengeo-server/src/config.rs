//! Layered server configuration loaded with figment.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`OPENGEO_*` prefix, `__` between sections,
//!    e.g. `OPENGEO_DB__URL` sets `db.url`)
//! 2. `opengeo.toml` in the working directory
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use opengeo_db::DbConfig;
use opengeo_service::ServiceConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Paging and scan limits handed to the services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_page_size: u64,
    pub scan_limit: u64,
    pub max_comment_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            max_page_size: service.max_page_size,
            scan_limit: service.scan_limit,
            max_comment_length: service.max_comment_length,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// Default `tracing` directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub db: DbConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            log_filter: "opengeo=info,tower_http=info".into(),
            db: DbConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `opengeo.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.env` file first, if any, then [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// The provider chain, public so tests can add layers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let local_path = PathBuf::from("opengeo.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("OPENGEO_").split("__"))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "bind_address".into(),
                reason: e.to_string(),
            })
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_page_size: self.limits.max_page_size,
            scan_limit: self.limits.scan_limit,
            max_comment_length: self.limits.max_comment_length,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.limits.max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_page_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.db.namespace, "opengeo");
        assert_eq!(config.service_config().max_page_size, 200);
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let config = ServerConfig {
            bind_address: "nowhere".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
