//! Historical observations HTTP client.
//!
//! Queries `/v1/geocode/{lat}/{lon}/observations/historical.json` for a
//! single day and reduces the returned readings to one observation.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use crash_risk_road_models::Coordinates;

use crate::config::WeatherConfig;
use crate::observation::{self, RawObservation, WeatherObservation};
use crate::{WeatherError, WeatherService, retry};

/// Weather service backed by the historical observations API.
#[derive(Debug, Clone)]
pub struct WeatherComClient {
    client: reqwest::Client,
    config: WeatherConfig,
    api_key: String,
}

impl WeatherComClient {
    /// Builds a client, reading the API key from the environment variable
    /// named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the variable is unset and
    /// [`WeatherError::Http`] if the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| WeatherError::Config {
            message: format!("environment variable {} is not set", config.api_key_env),
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Builds a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Http`] if the HTTP client cannot be built.
    pub fn with_api_key(
        config: WeatherConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Fetches every reading at `location` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if the request fails after retries or the
    /// response cannot be parsed.
    pub async fn historical(
        &self,
        location: Coordinates,
        date: NaiveDate,
    ) -> Result<Vec<RawObservation>, WeatherError> {
        let url = observation_url(&self.config.base_url, location);
        let day = date_param(date);
        let policy = self.config.retry_policy();

        log::debug!(
            "Fetching weather for ({}, {}) on {day}",
            location.latitude,
            location.longitude
        );

        let body = retry::send_json(&policy, || {
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("startDate", day.as_str()),
                ("endDate", day.as_str()),
            ])
        })
        .await?;

        observation::parse_observations(&body)
    }

    /// The reading closest to `at` (interpreted as UTC) at `location`.
    ///
    /// Used to attach weather to historical crash and control records.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::EmptyResponse`] if no timestamped reading
    /// exists, [`WeatherError::Incomplete`] if the closest one lacks a
    /// covariate, or any lookup error.
    pub async fn observe_at(
        &self,
        location: Coordinates,
        at: NaiveDateTime,
    ) -> Result<WeatherObservation, WeatherError> {
        let observations = self.historical(location, at.date()).await?;
        observation::nearest(&observations, at.and_utc())
            .ok_or_else(|| empty(location, at.date()))?
            .complete()
    }
}

#[async_trait]
impl WeatherService for WeatherComClient {
    async fn observe(
        &self,
        location: Coordinates,
        date: NaiveDate,
    ) -> Result<WeatherObservation, WeatherError> {
        let observations = self.historical(location, date).await?;
        observation::latest(&observations)
            .ok_or_else(|| empty(location, date))?
            .complete()
    }
}

const fn empty(location: Coordinates, date: NaiveDate) -> WeatherError {
    WeatherError::EmptyResponse {
        latitude: location.latitude,
        longitude: location.longitude,
        date,
    }
}

/// Endpoint for readings at `location`.
#[must_use]
pub fn observation_url(base_url: &str, location: Coordinates) -> String {
    format!(
        "{}/v1/geocode/{}/{}/observations/historical.json",
        base_url.trim_end_matches('/'),
        location.latitude,
        location.longitude
    )
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
