//! Configuration management for the upload orchestrator

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::auth::GOOGLE_TOKENINFO_URL;

/// Allotment for users the metadata store reports none for: 1 GiB
pub const DEFAULT_ALLOTMENT_BYTES: u64 = 1024 * 1024 * 1024;

/// Request body limit for a single chunk upload: 10 MiB
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub data_service: DataServiceConfig,
    pub identity: IdentityConfig,
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory staged chunks are written to
    pub staging_dir: PathBuf,
    pub max_chunk_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataServiceConfig {
    /// Base URL of the data service; `None` selects the in-process store
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub tokeninfo_url: String,
    /// Trust bearer tokens as user ids without verification
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub default_allotment: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                staging_dir: PathBuf::from("./temp"),
                max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            },
            data_service: DataServiceConfig { url: None },
            identity: IdentityConfig {
                tokeninfo_url: GOOGLE_TOKENINFO_URL.to_string(),
                disabled: false,
            },
            quota: QuotaConfig {
                default_allotment: DEFAULT_ALLOTMENT_BYTES,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", var("SERVER_PORT"), defaults.server.port)?,
            },
            storage: StorageConfig {
                staging_dir: var("STAGING_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.staging_dir),
                max_chunk_bytes: parse_or(
                    "MAX_CHUNK_BYTES",
                    var("MAX_CHUNK_BYTES"),
                    defaults.storage.max_chunk_bytes,
                )?,
            },
            data_service: DataServiceConfig {
                url: var("DATA_SVC_HOST"),
            },
            identity: IdentityConfig {
                tokeninfo_url: var("IDENTITY_TOKENINFO_URL")
                    .unwrap_or(defaults.identity.tokeninfo_url),
                disabled: parse_or("AUTH_DISABLED", var("AUTH_DISABLED"), false)?,
            },
            quota: QuotaConfig {
                default_allotment: parse_or(
                    "DEFAULT_ALLOTMENT_BYTES",
                    var("DEFAULT_ALLOTMENT_BYTES"),
                    defaults.quota.default_allotment,
                )?,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value,
        }),
    }
}
