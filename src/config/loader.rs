//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{RelayError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with RELAY_, sections split by `__`)
/// 2. Configuration file (TOML format)
/// 3. Default values
///
/// The result is validated; a missing operator credential is fatal.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("RELAY")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder
        .build()
        .map_err(|e| RelayError::Configuration(e.to_string()))?
        .try_deserialize()
        .map_err(|e| RelayError::Configuration(e.to_string()))?;

    config.validate()?;
    Ok(config)
}
