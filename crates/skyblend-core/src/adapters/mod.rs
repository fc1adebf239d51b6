//! Weather provider adapters.
//!
//! | Adapter | Key | Current | Forecast |
//! |---------|-----|---------|----------|
//! | [`OpenWeatherAdapter`] | `OPENWEATHER_API_KEY` | yes | yes (5 days max) |
//! | [`WeatherApiAdapter`] | `WEATHERAPI_API_KEY` | yes | yes |
//! | [`OpenMeteoAdapter`] | none | yes (coordinates only) | no |
//!
//! Every adapter owns a [`ResilientExecutor`] with its own circuit breaker,
//! so one misbehaving provider never trips another.

mod openmeteo;
mod openweather;
mod weatherapi;

use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use openmeteo::OpenMeteoAdapter;
pub use openweather::OpenWeatherAdapter;
pub use weatherapi::WeatherApiAdapter;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::AppConfig;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::resilience::{classify_response, classify_transport, ResilientExecutor};
use crate::retry::RetryConfig;
use crate::source::{FetchError, WeatherSource};
use crate::{CallContext, CoreError, SourceId, UtcDateTime};

/// Issues a resilient GET and decodes the JSON body.
///
/// Transport and status failures go through the executor's retry and
/// breaker; a body that fails to decode is a rejected response.
pub(crate) async fn get_json<T>(
    http_client: &dyn HttpClient,
    executor: &ResilientExecutor,
    ctx: &CallContext,
    url: &str,
) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let body = executor
        .execute(ctx, || {
            let request = HttpRequest::get(url)
                .with_header("Accept", "application/json")
                .with_timeout(ctx.remaining());
            async move {
                let response = http_client
                    .execute(request)
                    .await
                    .map_err(classify_transport)?;
                classify_response(&response)?;
                Ok(response.body)
            }
        })
        .await?;

    serde_json::from_str(&body).map_err(|error| {
        FetchError::rejected(format!(
            "failed to parse {} response: {error}",
            executor.source()
        ))
    })
}

/// Unix seconds to a timestamp, treating `0` and out-of-range values as
/// "not reported".
pub(crate) fn unix_or_none(seconds: i64) -> Option<UtcDateTime> {
    if seconds == 0 {
        return None;
    }
    UtcDateTime::from_unix(seconds).ok()
}

/// Assembles the configured source set.
///
/// Keyed adapters are only built when their key is present; Open-Meteo is
/// keyless and on unless switched off.
pub struct SourceSetBuilder {
    http_client: Arc<dyn HttpClient>,
    retry: RetryConfig,
    breaker: CircuitBreakerConfig,
    openweather_api_key: Option<String>,
    weatherapi_api_key: Option<String>,
    open_meteo: bool,
}

impl Default for SourceSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceSetBuilder {
    pub fn new() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            openweather_api_key: None,
            weatherapi_api_key: None,
            open_meteo: true,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retry: config.retry.clone(),
            breaker: config.breaker,
            openweather_api_key: config.openweather_api_key.clone(),
            weatherapi_api_key: config.weatherapi_api_key.clone(),
            open_meteo: config.open_meteo_enabled,
            ..Self::new()
        }
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_openweather_key(mut self, key: impl Into<String>) -> Self {
        self.openweather_api_key = Some(key.into());
        self
    }

    pub fn with_weatherapi_key(mut self, key: impl Into<String>) -> Self {
        self.weatherapi_api_key = Some(key.into());
        self
    }

    pub fn with_open_meteo(mut self, enabled: bool) -> Self {
        self.open_meteo = enabled;
        self
    }

    /// Builds the adapters. Fails only on an invalid retry schedule; an
    /// empty set is reported later, when a fetch is attempted.
    pub fn build(self) -> Result<Vec<Arc<dyn WeatherSource>>, CoreError> {
        let mut sources: Vec<Arc<dyn WeatherSource>> = Vec::new();

        if let Some(key) = self.openweather_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Arc::new(OpenWeatherAdapter::new(
                Arc::clone(&self.http_client),
                key,
                self.executor(SourceId::OPEN_WEATHER)?,
            )));
        }

        if let Some(key) = self.weatherapi_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Arc::new(WeatherApiAdapter::new(
                Arc::clone(&self.http_client),
                key,
                self.executor(SourceId::WEATHER_API)?,
            )));
        }

        if self.open_meteo {
            sources.push(Arc::new(OpenMeteoAdapter::new(
                Arc::clone(&self.http_client),
                self.executor(SourceId::OPEN_METEO)?,
            )));
        }

        Ok(sources)
    }

    fn executor(&self, source: SourceId) -> Result<ResilientExecutor, CoreError> {
        ResilientExecutor::new(
            source,
            self.retry.clone(),
            Arc::new(CircuitBreaker::new(self.breaker)),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::FixtureHttpClient;

    #[test]
    fn keyed_adapters_require_keys() {
        let sources = SourceSetBuilder::new()
            .with_http_client(Arc::new(FixtureHttpClient::new()))
            .build()
            .expect("builds");

        let ids: Vec<SourceId> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![SourceId::OPEN_METEO]);
    }

    #[test]
    fn all_adapters_enabled_with_keys() {
        let sources = SourceSetBuilder::new()
            .with_http_client(Arc::new(FixtureHttpClient::new()))
            .with_openweather_key("ow")
            .with_weatherapi_key("wa")
            .build()
            .expect("builds");

        let ids: Vec<SourceId> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec![
                SourceId::OPEN_WEATHER,
                SourceId::WEATHER_API,
                SourceId::OPEN_METEO
            ]
        );
    }

    #[test]
    fn disabling_open_meteo_can_leave_empty_set() {
        let sources = SourceSetBuilder::new()
            .with_http_client(Arc::new(FixtureHttpClient::new()))
            .with_open_meteo(false)
            .build()
            .expect("builds");

        assert!(sources.is_empty());
    }

    #[test]
    fn invalid_retry_schedule_is_misconfigured() {
        let error = SourceSetBuilder::new()
            .with_http_client(Arc::new(FixtureHttpClient::new()))
            .with_retry(RetryConfig::exponential(
                1,
                std::time::Duration::ZERO,
                std::time::Duration::ZERO,
            ))
            .build()
            .err()
            .expect("misconfigured");

        assert!(matches!(error, CoreError::Misconfigured(_)));
    }
}
