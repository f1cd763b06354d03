//! Service config loader (strict parsing).

pub mod schema;

use std::fs;

use citycount_core::error::{CityCountError, Result};

pub use schema::{
    PipelineSection, ServerSection, ServiceConfig, StoreSection, WeatherSection,
};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CITYCOUNT_CONFIG";
/// Environment variable overriding `weather.api_key`.
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";

const DEFAULT_CONFIG_PATH: &str = "citycount.yaml";

/// Resolve the config path from the environment, load it, then apply env overrides.
pub fn load() -> Result<ServiceConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = load_from_file(&path)?;
    cfg.apply_env(std::env::var(WEATHER_API_KEY_ENV).ok());
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| CityCountError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| CityCountError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
