//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{EngineError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with EBB_)
/// 2. Configuration file (TOML format)
/// 3. Default values
///
/// The returned config is validated; risk-affecting parameters fail fast.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Pick up a local .env before reading the environment
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("EBB")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| EngineError::Configuration(e.to_string()))?;

    let app: AppConfig = config
        .try_deserialize()
        .map_err(|e| EngineError::Configuration(e.to_string()))?;

    app.validate()?;
    Ok(app)
}
