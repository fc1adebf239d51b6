use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use time::Date;

use crate::adapters::{get_json, unix_or_none};
use crate::http_client::HttpClient;
use crate::resilience::ResilientExecutor;
use crate::source::{CapabilitySet, FetchError, SourceFuture, WeatherSource};
use crate::{CallContext, Condition, Location, Measurements, SourceId, SourceReading};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const MAX_FORECAST_DAYS: usize = 5;

/// OpenWeatherMap adapter (current weather plus the 5-day/3-hour forecast).
#[derive(Clone)]
pub struct OpenWeatherAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    executor: ResilientExecutor,
}

impl OpenWeatherAdapter {
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
        let place = match location.coords() {
            Some((lat, lon)) => format!("lat={lat:.4}&lon={lon:.4}"),
            None => format!("q={}", urlencoding::encode(&location.query())),
        };
        format!(
            "{}/data/2.5/{path}?{place}&appid={}&units=metric",
            self.base_url,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn fetch_current(
        &self,
        location: &Location,
        ctx: &CallContext,
    ) -> Result<SourceReading, FetchError> {
        let url = self.url("weather", location);
        let payload: OwCurrent =
            get_json(self.http_client.as_ref(), &self.executor, ctx, &url).await?;

        let precip_mm = payload
            .rain
            .as_ref()
            .and_then(|rain| rain.one_hour.filter(|v| *v != 0.0).or(rain.three_hours))
            .unwrap_or(0.0);

        self.reading(
            payload.dt,
            Measurements {
                temperature_c: payload.main.temp,
                humidity_pct: payload.main.humidity,
                wind_speed_ms: payload.wind.speed,
                pressure_hpa: payload.main.pressure,
                precip_mm,
            },
            map_condition(&payload.weather),
        )
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        days: usize,
        ctx: &CallContext,
    ) -> Result<Vec<SourceReading>, FetchError> {
        let days = days.min(MAX_FORECAST_DAYS);
        if days == 0 {
            return Ok(Vec::new());
        }

        let url = self.url("forecast", location);
        let payload: OwForecast =
            get_json(self.http_client.as_ref(), &self.executor, ctx, &url).await?;

        // One representative slot per UTC day, preferring the 12:00 slot.
        let mut per_day: BTreeMap<Date, (SourceReading, bool)> = BTreeMap::new();
        for item in payload.list {
            let reading = self.reading(
                item.dt,
                Measurements {
                    temperature_c: item.main.temp,
                    humidity_pct: item.main.humidity,
                    wind_speed_ms: item.wind.speed,
                    pressure_hpa: item.main.pressure,
                    precip_mm: item.rain.and_then(|rain| rain.three_hours).unwrap_or(0.0),
                },
                map_condition(&item.weather),
            )?;
            let Some(observed_at) = reading.observed_at else {
                continue;
            };
            let midday = observed_at.into_inner().hour() == 12;

            per_day
                .entry(observed_at.date())
                .and_modify(|(kept, kept_midday)| {
                    if midday && !*kept_midday {
                        *kept = reading.clone();
                        *kept_midday = true;
                    }
                })
                .or_insert((reading, midday));
        }

        Ok(per_day
            .into_values()
            .take(days)
            .map(|(reading, _)| reading)
            .collect())
    }

    fn reading(
        &self,
        dt: i64,
        measurements: Measurements,
        condition: Condition,
    ) -> Result<SourceReading, FetchError> {
        SourceReading::new(
            SourceId::OPEN_WEATHER,
            unix_or_none(dt),
            measurements,
            condition,
        )
        .map_err(|error| FetchError::rejected(format!("openweathermap returned {error}")))
    }
}

impl WeatherSource for OpenWeatherAdapter {
    fn id(&self) -> SourceId {
        SourceId::OPEN_WEATHER
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

fn map_condition(weather: &[OwWeather]) -> Condition {
    let Some(first) = weather.first() else {
        return Condition::Unknown;
    };
    match first.main.as_str() {
        "Clear" => Condition::Clear,
        "Clouds" => Condition::Cloudy,
        "Rain" | "Drizzle" => Condition::Rain,
        "Snow" => Condition::Snow,
        "Thunderstorm" => Condition::Storm,
        "Mist" | "Fog" | "Haze" | "Smoke" => Condition::Mist,
        _ => Condition::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    wind: OwWind,
    rain: Option<OwRain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecast {
    #[serde(default)]
    list: Vec<OwForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwForecastItem {
    dt: i64,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    wind: OwWind,
    rain: Option<OwRain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    #[serde(default)]
    temp: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}
