//! Environment-driven application configuration.
//!
//! Every setting has a default, so an empty environment yields a runnable
//! (if location-less) configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENWEATHER_API_KEY` | unset |
//! | `WEATHERAPI_API_KEY` | unset |
//! | `SKYBLEND_OPEN_METEO` | `true` |
//! | `FETCH_INTERVAL` | `15m` |
//! | `FETCH_TIMEOUT` | `30s` |
//! | `STORE_MAX_HISTORY` | `96` |
//! | `STORE_MAX_AGE` | `24h` |
//! | `WEATHER_LOCATION_CITY` / `WEATHER_LOCATION_COUNTRY` | empty |
//! | `RETRY_MAX_RETRIES` | `3` |
//! | `RETRY_INITIAL_DELAY` | `500ms` |
//! | `RETRY_MAX_DELAY` | `5s` |
//! | `BREAKER_FAILURE_THRESHOLD` | `5` |
//! | `BREAKER_WINDOW` | `1m` |
//! | `BREAKER_OPEN_TIMEOUT` | `2m` |
//! | `BREAKER_HALF_OPEN_CALLS` | `5` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;
use crate::store::RetentionPolicy;
use crate::{Location, ValidationError};

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("number of cities ({cities}) and countries ({countries}) must be the same")]
    LocationCountMismatch { cities: usize, countries: usize },

    #[error("invalid location #{index}: {source}")]
    InvalidLocation {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("failed to read env file '{}': {message}", path.display())]
    EnvFile { path: PathBuf, message: String },
}

/// Fully resolved application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub openweather_api_key: Option<String>,
    pub weatherapi_api_key: Option<String>,
    pub open_meteo_enabled: bool,
    pub fetch_interval: Duration,
    pub fetch_timeout: Duration,
    pub retention: RetentionPolicy,
    pub locations: Vec<Location>,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            weatherapi_api_key: None,
            open_meteo_enabled: true,
            fetch_interval: Duration::from_secs(15 * 60),
            fetch_timeout: Duration::from_secs(30),
            retention: RetentionPolicy::default(),
            locations: Vec::new(),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment, filling gaps from an env file.
    ///
    /// With `env_file = None` a `.env` in the working directory is used when
    /// present. An explicitly named file must exist. Process variables win
    /// over file entries, and the process environment is never modified.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => {
                let default_path = Path::new(".env");
                if default_path.is_file() {
                    read_env_file(default_path)?
                } else {
                    HashMap::new()
                }
            }
        };

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let retry_defaults = defaults.retry.backoff;
        let retry = RetryConfig::exponential(
            parse_or(get("RETRY_MAX_RETRIES"), "RETRY_MAX_RETRIES", defaults.retry.max_retries)?,
            duration_or(get("RETRY_INITIAL_DELAY"), "RETRY_INITIAL_DELAY", retry_defaults.initial_delay)?,
            duration_or(get("RETRY_MAX_DELAY"), "RETRY_MAX_DELAY", retry_defaults.max_delay)?,
        );

        let breaker = CircuitBreakerConfig {
            failure_threshold: parse_or(
                get("BREAKER_FAILURE_THRESHOLD"),
                "BREAKER_FAILURE_THRESHOLD",
                defaults.breaker.failure_threshold,
            )?,
            failure_window: duration_or(
                get("BREAKER_WINDOW"),
                "BREAKER_WINDOW",
                defaults.breaker.failure_window,
            )?,
            open_timeout: duration_or(
                get("BREAKER_OPEN_TIMEOUT"),
                "BREAKER_OPEN_TIMEOUT",
                defaults.breaker.open_timeout,
            )?,
            half_open_max_calls: parse_or(
                get("BREAKER_HALF_OPEN_CALLS"),
                "BREAKER_HALF_OPEN_CALLS",
                defaults.breaker.half_open_max_calls,
            )?,
        };

        let retention = RetentionPolicy {
            max_entries: parse_or(
                get("STORE_MAX_HISTORY"),
                "STORE_MAX_HISTORY",
                defaults.retention.max_entries,
            )?,
            max_age: duration_or(get("STORE_MAX_AGE"), "STORE_MAX_AGE", defaults.retention.max_age)?,
        };

        Ok(Self {
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            weatherapi_api_key: get("WEATHERAPI_API_KEY"),
            open_meteo_enabled: bool_or(
                get("SKYBLEND_OPEN_METEO"),
                "SKYBLEND_OPEN_METEO",
                defaults.open_meteo_enabled,
            )?,
            fetch_interval: duration_or(
                get("FETCH_INTERVAL"),
                "FETCH_INTERVAL",
                defaults.fetch_interval,
            )?,
            fetch_timeout: duration_or(get("FETCH_TIMEOUT"), "FETCH_TIMEOUT", defaults.fetch_timeout)?,
            retention,
            locations: parse_locations(
                get("WEATHER_LOCATION_CITY"),
                get("WEATHER_LOCATION_COUNTRY"),
            )?,
            retry,
            breaker,
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_error = |error: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: error.to_string(),
    };

    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_error)? {
        let (key, value) = item.map_err(env_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn parse_locations(
    cities: Option<String>,
    countries: Option<String>,
) -> Result<Vec<Location>, ConfigError> {
    let Some(cities) = cities else {
        return Ok(Vec::new());
    };

    let cities: Vec<&str> = cities.split(',').collect();
    let countries: Vec<&str> = countries.as_deref().unwrap_or("").split(',').collect();
    if cities.len() != countries.len() {
        return Err(ConfigError::LocationCountMismatch {
            cities: cities.len(),
            countries: countries.len(),
        });
    }

    cities
        .into_iter()
        .zip(countries)
        .enumerate()
        .map(|(index, (city, country))| {
            Location::city(city, country)
                .map_err(|source| ConfigError::InvalidLocation { index, source })
        })
        .collect()
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|error: T::Err| ConfigError::InvalidValue {
            key,
            reason: error.to_string(),
            value: raw,
        }),
    }
}

fn duration_or(
    value: Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => parse_duration(&raw).map_err(|reason| ConfigError::InvalidValue {
            key,
            value: raw,
            reason,
        }),
    }
}

fn bool_or(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: String::from("expected true or false"),
        }),
    }
}

/// Parses `500ms`, `30s`, `15m`, `24h`, compound forms such as `1h30m`, or
/// bare seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(String::from("empty duration"));
    }
    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let (number, tail) = rest.split_at(number_len);
        let amount: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{number}'"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let seconds = match unit {
            "ms" => amount / 1000.0,
            "s" => amount,
            "m" => amount * 60.0,
            "h" => amount * 3600.0,
            "" => return Err(format!("missing unit after '{number}'")),
            other => return Err(format!("unknown unit '{other}'")),
        };

        let part = Duration::try_from_secs_f64(seconds)
            .map_err(|error| format!("duration out of range: {error}"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| String::from("duration overflow"))?;
        rest = tail;
    }

    Ok(total)
}
