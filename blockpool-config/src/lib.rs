//! # Blockpool Configuration System
//!
//! Layered configuration for pool allocator sessions, the list container
//! built on top of them, and telemetry.
//!
//! ## Features
//! - **Layered sources**: defaults, YAML files, then `BLOCKPOOL_*` environment variables
//! - **Validation**: every loaded configuration is checked before it is returned
//! - **Human-friendly sizes**: capacities accept `"64KiB"`-style strings

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

mod error;
mod pool;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use pool::{ListConfig, PoolConfig};
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/blockpool.yaml";
const ENV_PREFIX: &str = "BLOCKPOOL_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct BlockpoolConfig {
    /// Allocator session parameters.
    #[validate(nested)]
    #[serde(default)]
    pub pool: PoolConfig,

    /// List container parameters.
    #[validate(nested)]
    #[serde(default)]
    pub list: ListConfig,

    /// Logging and metrics parameters.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BlockpoolConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/blockpool.yaml`, if present
    /// 3. `config/<BLOCKPOOL_ENV>.yaml`, if present (`BLOCKPOOL_ENV` defaults to `production`)
    /// 4. `BLOCKPOOL_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(BlockpoolConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        } else {
            debug!("{} not found, using default configuration", BASE_FILE);
        }

        let env = std::env::var("BLOCKPOOL_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Self::env_provider()))
    }

    /// Load configuration from a specific file, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(BlockpoolConfig::default()))
                .merge(Yaml::file(path))
                .merge(Self::env_provider()),
        )
    }

    /// Renders the configuration as YAML accepted by [`Self::load_from_path`].
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the configuration to `path` as YAML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX)
            .ignore(&["ENV"])
            .split("__")
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
