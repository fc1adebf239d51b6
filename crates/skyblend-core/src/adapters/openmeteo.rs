use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::adapters::get_json;
use crate::http_client::HttpClient;
use crate::resilience::ResilientExecutor;
use crate::source::{CapabilitySet, FetchError, SourceFuture, WeatherSource};
use crate::{
    CallContext, Condition, Location, Measurements, SourceId, SourceReading, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

/// Keyless Open-Meteo adapter. Only locations carrying coordinates can be
/// served; city-only locations are rejected without a network call.
#[derive(Clone)]
pub struct OpenMeteoAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    executor: ResilientExecutor,
}

impl OpenMeteoAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, executor: ResilientExecutor) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_BASE_URL),
            executor,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_current(
        &self,
        location: &Location,
        ctx: &CallContext,
    ) -> Result<SourceReading, FetchError> {
        let Some((lat, lon)) = location.coords() else {
            return Err(FetchError::rejected(format!(
                "openmeteo requires coordinates; '{}' has none",
                location.key()
            )));
        };

        let url = format!(
            "{}/v1/forecast?latitude={lat:.4}&longitude={lon:.4}&current_weather=true&windspeed_unit=ms&timezone=UTC",
            self.base_url
        );
        let payload: OmResponse =
            get_json(self.http_client.as_ref(), &self.executor, ctx, &url).await?;
        let current = payload.current_weather;

        // current_weather only carries temperature, wind and a WMO code.
        SourceReading::new(
            SourceId::OPEN_METEO,
            parse_time(&current.time),
            Measurements {
                temperature_c: current.temperature,
                wind_speed_ms: current.windspeed,
                ..Measurements::default()
            },
            map_wmo_code(current.weathercode),
        )
        .map_err(|error| FetchError::rejected(format!("openmeteo returned {error}")))
    }
}

impl WeatherSource for OpenMeteoAdapter {
    fn id(&self) -> SourceId {
        SourceId::OPEN_METEO
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::current_only()
    }

    fn current<'a>(
        &'a self,
        location: &'a Location,
        ctx: &'a CallContext,
    ) -> SourceFuture<'a, SourceReading> {
        Box::pin(self.fetch_current(location, ctx))
    }
}

/// Open-Meteo reports `YYYY-MM-DDTHH:MM` in the requested timezone (UTC).
fn parse_time(value: &str) -> Option<UtcDateTime> {
    if let Ok(parsed) = UtcDateTime::parse(value) {
        return Some(parsed);
    }
    PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .ok()
        .map(|naive| UtcDateTime::from_offset_datetime(naive.assume_utc()))
}

fn map_wmo_code(code: i64) -> Condition {
    match code {
        0 => Condition::Clear,
        1..=3 => Condition::Cloudy,
        45 | 48 => Condition::Mist,
        51..=67 | 80..=82 => Condition::Rain,
        71..=77 | 85 | 86 => Condition::Snow,
        95.. => Condition::Storm,
        _ => Condition::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current_weather: OmCurrent,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    windspeed: f64,
    #[serde(default)]
    weathercode: i64,
    #[serde(default)]
    time: String,
}
