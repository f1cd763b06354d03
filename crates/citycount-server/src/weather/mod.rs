//! Weather lookup client.
//!
//! Stateless request/decode wrapper over the OpenWeatherMap current-weather
//! endpoint, instrumented with duration, in-flight, per-status and error
//! metrics. `citycount_weather_errors_total` counts transport failures only;
//! an answered request with a bad status or body shows up under its status
//! label instead.
//!
//! The request URL carries the API key, so reqwest errors are stripped of
//! their URL before they reach a log line or a response body.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use citycount_core::error::{CityCountError, Result};

use crate::config::WeatherSection;
use crate::obs::{InFlight, Metrics};

const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";

/// Response body for `/city/{name}/temp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTemp {
    #[serde(rename = "Temp")]
    pub temp: f64,
    #[serde(rename = "Unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize)]
struct CityResult {
    main: MainResult,
}

#[derive(Debug, Deserialize)]
struct MainResult {
    temp: f64,
}

pub struct WeatherClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    metrics: Arc<Metrics>,
}

impl WeatherClient {
    pub fn new(cfg: &WeatherSection, metrics: Arc<Metrics>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| CityCountError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            metrics,
        })
    }

    /// Current temperature for `city`, in Celsius.
    pub async fn city_temp(&self, city: &str) -> Result<CityTemp> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CityCountError::Config(format!("must set {}", crate::config::WEATHER_API_KEY_ENV)))?;

        let resp = self
            .get(CURRENT_WEATHER_PATH, &[("q", city), ("units", "metric"), ("appid", api_key)])
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CityCountError::Upstream(format!(
                "weather service returned {status} for {city}"
            )));
        }

        let result: CityResult = resp.json().await.map_err(|e| {
            CityCountError::Upstream(format!(
                "weather response decode failed: {}",
                e.without_url()
            ))
        })?;

        Ok(CityTemp {
            temp: result.main.temp,
            unit: "C".to_string(),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.api_url, path);
        tracing::debug!(%url, "weather request");

        let in_flight = InFlight::start(
            &self.metrics.weather_in_flight,
            self.metrics.weather_duration.clone(),
        );
        let res = self.http.get(&url).query(params).send().await;
        drop(in_flight);

        match res {
            Ok(resp) => {
                self.metrics
                    .weather_status
                    .with_label_values(&[resp.status().as_str()])
                    .inc();
                Ok(resp)
            }
            Err(e) => {
                self.metrics.weather_errors.inc();
                Err(CityCountError::Upstream(format!(
                    "weather request failed: {}",
                    e.without_url()
                )))
            }
        }
    }
}
