use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types. All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("chain.rpc_url is required")]
    MissingRpcUrl,

    #[error("chain.signing_key is required")]
    MissingSigningKey,

    #[error("chain.contract_address is required")]
    MissingContractAddress,

    #[error("chain.confirmations must be at least 1")]
    InvalidConfirmations,

    #[error("database.path cannot be empty")]
    EmptyDatabasePath,

    #[error("database.max_connections must be at least 1")]
    InvalidMaxConnections,

    #[error("cache TTLs must be positive")]
    InvalidCacheTtl,

    #[error("metadata.gateway_url cannot be empty")]
    EmptyGatewayUrl,

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error(
        "invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `nexus-sync.yaml` in the working directory
    /// 3. Environment variables (`NEXUS_SYNC_*` prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("nexus-sync.yaml"))
            .merge(Env::prefixed("NEXUS_SYNC_").split("__"))
            .extract()
            .context("failed to extract configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("NEXUS_SYNC_").split("__"))
            .extract()
            .context(format!(
                "failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading. Missing chain settings are a
    /// fatal startup error, not a runtime one.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.chain.rpc_url.is_empty() {
            return Err(ConfigError::MissingRpcUrl);
        }
        if config.chain.signing_key.is_empty() {
            return Err(ConfigError::MissingSigningKey);
        }
        if config.chain.contract_address.is_empty() {
            return Err(ConfigError::MissingContractAddress);
        }
        if config.chain.confirmations == 0 {
            return Err(ConfigError::InvalidConfirmations);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }

        if config.cache.default_ttl_secs == 0 || config.cache.status_ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl);
        }

        if config.metadata.gateway_url.is_empty() {
            return Err(ConfigError::EmptyGatewayUrl);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> Config {
        let mut config = Config::default();
        config.chain.rpc_url = "https://rpc.example".into();
        config.chain.signing_key = "0xkey".into();
        config.chain.contract_address = "0xregistry".into();
        config
    }

    #[test]
    fn test_defaults_fail_without_chain_settings() {
        let err = ConfigLoader::validate(&Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRpcUrl));
    }

    #[test]
    fn test_each_chain_field_is_required() {
        let mut config = configured();
        config.chain.signing_key = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::MissingSigningKey
        ));

        let mut config = configured();
        config.chain.contract_address = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::MissingContractAddress
        ));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(ConfigLoader::validate(&configured()).is_ok());
    }

    #[test]
    fn test_rejects_bad_log_level_and_backoff() {
        let mut config = configured();
        config.logging.level = "verbose".into();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogLevel(_)
        ));

        let mut config = configured();
        config.retry.initial_backoff_ms = 10_000;
        config.retry.max_backoff_ms = 5_000;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(10_000, 5_000)
        ));
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            concat!(
                "chain:\n",
                "  rpc_url: https://rpc.example\n",
                "  signing_key: 0xkey\n",
                "  contract_address: '0xregistry'\n",
                "cache:\n",
                "  default_ttl_secs: 1800\n",
            )
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.chain.rpc_url, "https://rpc.example");
        assert_eq!(config.cache.default_ttl_secs, 1800);
        // Untouched defaults survive the merge
        assert_eq!(config.cache.status_ttl_secs, 300);
        assert_eq!(config.chain.confirmations, 1);
    }
}
