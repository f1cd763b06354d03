use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use citycount_core::error::{CityCountError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub weather: WeatherSection,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CityCountError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.store.validate()?;
        self.pipeline.validate()?;
        self.weather.validate()?;
        Ok(())
    }

    /// Non-empty env value wins over the file.
    pub fn apply_env(&mut self, weather_api_key: Option<String>) {
        if let Some(key) = weather_api_key.filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            CityCountError::Config(format!("server.listen must be a valid socket address: {e}"))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default = "default_store_addr")]
    pub addr: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_pool_timeout_ms")]
    pub pool_timeout_ms: u64,

    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            addr: default_store_addr(),
            pool_size: default_pool_size(),
            pool_timeout_ms: default_pool_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(CityCountError::Config("store.addr must not be empty".into()));
        }
        if !(1..=1024).contains(&self.pool_size) {
            return Err(CityCountError::Config(
                "store.pool_size must be between 1 and 1024".into(),
            ));
        }
        if self.pool_timeout_ms == 0 || self.op_timeout_ms == 0 {
            return Err(CityCountError::Config(
                "store timeouts must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_idle_check_interval_ms")]
    pub idle_check_interval_ms: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            idle_check_interval_ms: default_idle_check_interval_ms(),
        }
    }
}

impl PipelineSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1_000_000).contains(&self.queue_capacity) {
            return Err(CityCountError::Config(
                "pipeline.queue_capacity must be between 1 and 1000000".into(),
            ));
        }
        if !(100..=600_000).contains(&self.idle_check_interval_ms) {
            return Err(CityCountError::Config(
                "pipeline.idle_check_interval_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherSection {
    #[serde(default = "default_weather_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            api_url: default_weather_url(),
            api_key: None,
            timeout_ms: default_weather_timeout_ms(),
        }
    }
}

impl WeatherSection {
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(CityCountError::Config("weather.api_url must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(CityCountError::Config(
                "weather.timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_store_addr() -> String {
    "redis://127.0.0.1:6379".into()
}
fn default_pool_size() -> usize {
    10
}
fn default_pool_timeout_ms() -> u64 {
    4000
}
fn default_op_timeout_ms() -> u64 {
    3000
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_idle_check_interval_ms() -> u64 {
    10_000
}
fn default_weather_url() -> String {
    "http://api.openweathermap.org".into()
}
fn default_weather_timeout_ms() -> u64 {
    15_000
}
