use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use crate::adapters::{get_json, unix_or_none};
use crate::http_client::HttpClient;
use crate::resilience::ResilientExecutor;
use crate::source::{CapabilitySet, FetchError, SourceFuture, WeatherSource};
use crate::{
    CallContext, Condition, Location, Measurements, SourceId, SourceReading, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// WeatherAPI.com adapter (current conditions and daily forecast).
#[derive(Clone)]
pub struct WeatherApiAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    executor: ResilientExecutor,
}

impl WeatherApiAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        executor: ResilientExecutor,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            executor,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str, location: &Location) -> String {
        format!(
            "{}/v1/{path}?key={}&q={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&location.query())
        )
    }

    async fn fetch_current(
        &self,
        location: &Location,
        ctx: &CallContext,
    ) -> Result<SourceReading, FetchError> {
        let url = self.url("current.json", location);
        let payload: WaCurrentResponse =
            get_json(self.http_client.as_ref(), &self.executor, ctx, &url).await?;

        let current = payload.current;
        let observed_at = unix_or_none(current.last_updated_epoch)
            .or_else(|| payload.location.and_then(|l| unix_or_none(l.localtime_epoch)));

        reading(
            observed_at,
            Measurements {
                temperature_c: current.temp_c,
                humidity_pct: current.humidity,
                wind_speed_ms: kph_to_ms(current.wind_kph),
                pressure_hpa: current.pressure_mb,
                precip_mm: current.precip_mm,
            },
            map_condition(&current.condition.text),
        )
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        days: usize,
        ctx: &CallContext,
    ) -> Result<Vec<SourceReading>, FetchError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}&days={days}", self.url("forecast.json", location));
        let payload: WaForecastResponse =
            get_json(self.http_client.as_ref(), &self.executor, ctx, &url).await?;

        let mut readings = payload
            .forecast
            .forecastday
            .into_iter()
            .map(|day| {
                let date = Date::parse(&day.date, format_description!("[year]-[month]-[day]"))
                    .map_err(|error| {
                        FetchError::rejected(format!(
                            "weatherapi returned invalid date '{}': {error}",
                            day.date
                        ))
                    })?;
                let observed_at =
                    UtcDateTime::from_offset_datetime(date.midnight().assume_utc());

                // Daily summaries carry no pressure; it averages in as 0.0.
                reading(
                    Some(observed_at),
                    Measurements {
                        temperature_c: day.day.avgtemp_c,
                        humidity_pct: day.day.avghumidity,
                        wind_speed_ms: kph_to_ms(day.day.maxwind_kph),
                        pressure_hpa: 0.0,
                        precip_mm: day.day.totalprecip_mm,
                    },
                    map_condition(&day.day.condition.text),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        readings.sort_by_key(|reading| reading.observed_at);
        readings.truncate(days);
        Ok(readings)
    }
}

impl WeatherSource for WeatherApiAdapter {
    fn id(&self) -> SourceId {
        SourceId::WEATHER_API
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn current<'a>(
        &'a self,
        location: &'a Location,
        ctx: &'a CallContext,
    ) -> SourceFuture<'a, SourceReading> {
        Box::pin(self.fetch_current(location, ctx))
    }

    fn forecast<'a>(
        &'a self,
        location: &'a Location,
        days: usize,
        ctx: &'a CallContext,
    ) -> SourceFuture<'a, Vec<SourceReading>> {
        Box::pin(self.fetch_forecast(location, days, ctx))
    }
}

fn reading(
    observed_at: Option<UtcDateTime>,
    measurements: Measurements,
    condition: Condition,
) -> Result<SourceReading, FetchError> {
    SourceReading::new(SourceId::WEATHER_API, observed_at, measurements, condition)
        .map_err(|error| FetchError::rejected(format!("weatherapi returned {error}")))
}

fn kph_to_ms(kph: f64) -> f64 {
    kph / 3.6
}

/// Maps WeatherAPI's free-text condition. Order matters: "Patchy light
/// rain with thunder" is rain, "Thundery outbreaks" is storm.
fn map_condition(text: &str) -> Condition {
    let text = text.to_lowercase();
    let has = |needle: &str| text.contains(needle);

    if text.is_empty() {
        Condition::Unknown
    } else if has("rain") || has("shower") || has("drizzle") {
        Condition::Rain
    } else if has("snow") || has("sleet") || has("blizzard") || has("ice pellets") {
        Condition::Snow
    } else if has("thunder") || has("storm") {
        Condition::Storm
    } else if has("mist") || has("fog") {
        Condition::Mist
    } else if has("cloud") || has("overcast") {
        Condition::Cloudy
    } else if has("sunny") || has("clear") {
        Condition::Clear
    } else {
        Condition::Unknown
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrentResponse {
    location: Option<WaLocation>,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    #[serde(default)]
    localtime_epoch: i64,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    #[serde(default)]
    last_updated_epoch: i64,
    #[serde(default)]
    temp_c: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    wind_kph: f64,
    #[serde(default)]
    pressure_mb: f64,
    #[serde(default)]
    precip_mm: f64,
    #[serde(default)]
    condition: WaCondition,
}

#[derive(Debug, Default, Deserialize)]
struct WaCondition {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    #[serde(default)]
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    #[serde(default)]
    avgtemp_c: f64,
    #[serde(default)]
    avghumidity: f64,
    #[serde(default)]
    maxwind_kph: f64,
    #[serde(default)]
    totalprecip_mm: f64,
    #[serde(default)]
    condition: WaCondition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{ctx, executor};
    use crate::http_client::{FixtureHttpClient, HttpResponse};
    use crate::source::FetchErrorKind;

    fn adapter(client: Arc<FixtureHttpClient>) -> WeatherApiAdapter {
        WeatherApiAdapter::new(client, "wa-key", executor(SourceId::WEATHER_API))
            .with_base_url("https://wa.test")
    }

    fn rome() -> Location {
        Location::city("Rome", "IT").expect("valid")
    }

    #[tokio::test]
    async fn parses_current_and_converts_wind() {
        let body = r#"{
            "location": {"localtime_epoch": 1717243260},
            "current": {
                "last_updated_epoch": 1717243200,
                "temp_c": 24.0,
                "humidity": 40,
                "wind_kph": 36.0,
                "pressure_mb": 1009.0,
                "precip_mm": 0.0,
                "condition": {"text": "Partly cloudy"}
            }
        }"#;
        let client = Arc::new(
            FixtureHttpClient::new().route("/v1/current.json", HttpResponse::ok_json(body)),
        );

        let reading = adapter(client.clone())
            .current(&rome(), &ctx())
            .await
            .expect("parses");

        assert_eq!(reading.measurements.wind_speed_ms, 10.0);
        assert_eq!(reading.measurements.pressure_hpa, 1009.0);
        assert_eq!(reading.condition, Condition::Cloudy);
        assert_eq!(
            reading.observed_at.map(|t| t.unix_timestamp()),
            Some(1_717_243_200)
        );
        assert!(client.requests()[0].url.contains("key=wa-key&q=Rome%2CIT"));
    }

    #[tokio::test]
    async fn forecast_yields_one_reading_per_day() {
        let body = r#"{"forecast": {"forecastday": [
            {"date": "2024-06-02", "day": {"avgtemp_c": 21.0, "avghumidity": 50, "maxwind_kph": 18, "totalprecip_mm": 2.5, "condition": {"text": "Moderate rain"}}},
            {"date": "2024-06-01", "day": {"avgtemp_c": 19.0, "avghumidity": 55, "maxwind_kph": 7.2, "totalprecip_mm": 0, "condition": {"text": "Sunny"}}},
            {"date": "2024-06-03", "day": {"avgtemp_c": 17.0, "condition": {"text": "Patchy snow possible"}}}
        ]}}"#;
        let client = Arc::new(
            FixtureHttpClient::new().route("/v1/forecast.json", HttpResponse::ok_json(body)),
        );

        let readings = adapter(client.clone())
            .forecast(&rome(), 2, &ctx())
            .await
            .expect("parses");

        assert_eq!(readings.len(), 2);
        assert_eq!(
            readings[0].observed_at.map(|t| t.format_rfc3339()).as_deref(),
            Some("2024-06-01T00:00:00Z")
        );
        assert_eq!(readings[0].condition, Condition::Clear);
        assert_eq!(readings[0].measurements.wind_speed_ms, 2.0);
        assert_eq!(readings[1].condition, Condition::Rain);
        assert!(client.requests()[0].url.ends_with("&days=2"));
    }

    #[tokio::test]
    async fn invalid_forecast_date_is_rejected() {
        let body = r#"{"forecast": {"forecastday": [{"date": "June 1st", "day": {}}]}}"#;
        let client = Arc::new(
            FixtureHttpClient::new().route("/v1/forecast.json", HttpResponse::ok_json(body)),
        );

        let error = adapter(client)
            .forecast(&rome(), 1, &ctx())
            .await
            .expect_err("bad date");

        assert_eq!(error.kind(), FetchErrorKind::RemoteRejected);
    }

    #[test]
    fn maps_free_text_conditions() {
        assert_eq!(map_condition("Light drizzle"), Condition::Rain);
        assert_eq!(map_condition("Patchy light rain with thunder"), Condition::Rain);
        assert_eq!(map_condition("Thundery outbreaks possible"), Condition::Storm);
        assert_eq!(map_condition("Blizzard"), Condition::Snow);
        assert_eq!(map_condition("Freezing fog"), Condition::Mist);
        assert_eq!(map_condition("Overcast"), Condition::Cloudy);
        assert_eq!(map_condition("Clear"), Condition::Clear);
        assert_eq!(map_condition(""), Condition::Unknown);
    }
}
