//! Behaviour tests for environment configuration and source-set wiring.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use skyblend_core::config::{parse_duration, ConfigError};
use skyblend_tests::*;

fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

// =============================================================================
// Config: Parsing
// =============================================================================

#[test]
fn when_environment_is_empty_system_uses_defaults() {
    let config = config_from(&[]).expect("defaults are valid");

    assert_eq!(config, AppConfig::default());
    assert_eq!(config.fetch_interval, Duration::from_secs(900));
    assert_eq!(config.retention.max_entries, 96);
    assert!(config.open_meteo_enabled);
    assert!(config.locations.is_empty());
}

#[test]
fn when_locations_are_listed_system_pairs_cities_with_countries() {
    let config = config_from(&[
        ("WEATHER_LOCATION_CITY", "Berlin, Oslo"),
        ("WEATHER_LOCATION_COUNTRY", "DE,NO"),
    ])
    .expect("valid");

    let keys: Vec<String> = config.locations.iter().map(|l| l.key().to_string()).collect();
    assert_eq!(keys, vec![String::from("berlin:de"), String::from("oslo:no")]);
}

#[test]
fn when_city_and_country_counts_differ_system_refuses_to_start() {
    let error = config_from(&[
        ("WEATHER_LOCATION_CITY", "Berlin,Oslo,Rome"),
        ("WEATHER_LOCATION_COUNTRY", "DE,NO"),
    ])
    .expect_err("mismatch");

    assert_eq!(
        error,
        ConfigError::LocationCountMismatch {
            cities: 3,
            countries: 2
        }
    );
}

#[test]
fn when_a_duration_is_malformed_system_names_the_variable() {
    let error = config_from(&[("FETCH_TIMEOUT", "soon")]).expect_err("invalid");

    assert!(matches!(
        error,
        ConfigError::InvalidValue { key: "FETCH_TIMEOUT", .. }
    ));
}

#[test]
fn when_durations_use_units_system_parses_them() {
    assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
    assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
    assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
    assert!(parse_duration("-5s").is_err());
}

// =============================================================================
// Config: Env Files
// =============================================================================

#[test]
fn when_env_file_is_given_system_reads_it() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "# test settings").expect("write");
    writeln!(file, "STORE_MAX_HISTORY=12").expect("write");
    writeln!(file, "BREAKER_HALF_OPEN_CALLS=2").expect("write");

    let config = AppConfig::load(Some(file.path())).expect("loads");

    assert_eq!(config.retention.max_entries, 12);
    assert_eq!(config.breaker.half_open_max_calls, 2);
}

#[test]
fn when_named_env_file_is_missing_system_reports_it() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.env");

    let error = AppConfig::load(Some(&missing)).expect_err("missing file");

    assert!(matches!(error, ConfigError::EnvFile { .. }));
}

// =============================================================================
// Config: Wiring
// =============================================================================

#[test]
fn when_keys_are_configured_system_enables_matching_adapters() {
    let config = config_from(&[
        ("WEATHERAPI_API_KEY", "wa-key"),
        ("SKYBLEND_OPEN_METEO", "false"),
    ])
    .expect("valid");

    let sources = SourceSetBuilder::from_config(&config)
        .with_http_client(Arc::new(FixtureHttpClient::new()))
        .build()
        .expect("builds");

    let ids: Vec<SourceId> = sources.iter().map(|source| source.id()).collect();
    assert_eq!(ids, vec![SourceId::WEATHER_API]);
}

#[test]
fn when_retry_delay_is_zero_system_reports_misconfiguration() {
    let config = config_from(&[("RETRY_INITIAL_DELAY", "0s")]).expect("parses");

    let error = SourceSetBuilder::from_config(&config)
        .with_http_client(Arc::new(FixtureHttpClient::new()))
        .build()
        .err()
        .expect("invalid schedule");

    assert!(matches!(error, CoreError::Misconfigured(_)));
}
