//! Behaviour tests for multi-source daily forecasts.

use std::time::Duration;

use skyblend_tests::*;

const OPENWEATHER_FORECAST: &str = r#"{"list": [
    {"dt": 1717232400, "main": {"temp": 12}, "weather": [{"main": "Clouds"}]},
    {"dt": 1717243200, "main": {"temp": 14}, "weather": [{"main": "Clouds"}]},
    {"dt": 1717329600, "main": {"temp": 16}, "weather": [{"main": "Rain"}]}
]}"#;

const WEATHERAPI_FORECAST: &str = r#"{"forecast": {"forecastday": [
    {"date": "2024-06-01", "day": {"avgtemp_c": 18.0, "avghumidity": 50, "maxwind_kph": 7.2, "totalprecip_mm": 0, "condition": {"text": "Cloudy"}}},
    {"date": "2024-06-02", "day": {"avgtemp_c": 20.0, "avghumidity": 70, "maxwind_kph": 14.4, "totalprecip_mm": 3, "condition": {"text": "Light rain"}}}
]}}"#;

// =============================================================================
// Forecast: Aggregation by Day
// =============================================================================

#[tokio::test]
async fn when_two_providers_forecast_system_merges_them_per_day() {
    // Given: OpenWeatherMap and WeatherAPI both forecast June 1st and 2nd
    let client = Arc::new(
        FixtureHttpClient::new()
            .route("/data/2.5/forecast", HttpResponse::ok_json(OPENWEATHER_FORECAST))
            .route("/v1/forecast.json", HttpResponse::ok_json(WEATHERAPI_FORECAST)),
    );
    let sources = SourceSetBuilder::new()
        .with_http_client(client)
        .with_openweather_key("ow-key")
        .with_weatherapi_key("wa-key")
        .with_open_meteo(false)
        .build()
        .expect("valid source set");
    let (service, _observer) = service_with(sources, Duration::from_secs(30));

    // When: a two-day forecast is requested
    let days = service
        .get_forecast(&berlin(), 2, &CancelToken::new())
        .await
        .expect("forecast available");

    // Then: each day averages both providers and is stamped at midnight UTC
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].observed_at.format_rfc3339(), "2024-06-01T00:00:00Z");
    assert_eq!(days[0].measurements.temperature_c, 16.0);
    assert_eq!(days[0].condition, Condition::Cloudy);
    assert_eq!(days[0].contributors.len(), 2);
    assert_eq!(days[1].observed_at.format_rfc3339(), "2024-06-02T00:00:00Z");
    assert_eq!(days[1].measurements.temperature_c, 18.0);
    assert_eq!(days[1].condition, Condition::Rain);
}

#[tokio::test]
async fn when_forecast_is_requested_system_does_not_touch_history() {
    let (service, _observer) = service_with(
        vec![Arc::new(
            StubSource::replying("alpha", 10.0, Condition::Clear)
                .with_forecast_from(utc("2024-06-01T12:00:00Z")),
        )],
        Duration::from_secs(5),
    );

    let days = service
        .get_forecast(&berlin(), 3, &CancelToken::new())
        .await
        .expect("forecast available");

    assert_eq!(days.len(), 3);
    let temps: Vec<f64> = days.iter().map(|d| d.measurements.temperature_c).collect();
    assert_eq!(temps, vec![10.0, 11.0, 12.0]);
    assert!(service.get_latest(&berlin()).await.expect_err("not stored").is_not_found());
}

// =============================================================================
// Forecast: Edge Cases
// =============================================================================

#[tokio::test]
async fn when_zero_days_are_requested_system_rejects_the_argument() {
    let (service, _observer) = service_with(
        vec![Arc::new(
            StubSource::replying("alpha", 10.0, Condition::Clear)
                .with_forecast_from(utc("2024-06-01T12:00:00Z")),
        )],
        Duration::from_secs(5),
    );

    let error = service
        .get_forecast(&berlin(), 0, &CancelToken::new())
        .await
        .expect_err("invalid");

    assert!(matches!(error, CoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn when_only_current_sources_exist_system_reports_misconfiguration() {
    let (service, _observer) = service_with(
        vec![Arc::new(StubSource::replying("alpha", 10.0, Condition::Clear))],
        Duration::from_secs(5),
    );

    let error = service
        .get_forecast(&berlin(), 3, &CancelToken::new())
        .await
        .expect_err("no forecast source");

    assert!(matches!(error, CoreError::Misconfigured(_)));
}

#[tokio::test]
async fn when_every_forecast_source_fails_system_reports_not_found() {
    let (service, observer) = service_with(
        vec![Arc::new(
            StubSource::failing("alpha", FetchError::transient("503"))
                .with_forecast_from(utc("2024-06-01T12:00:00Z")),
        )],
        Duration::from_secs(5),
    );

    let error = service
        .get_forecast(&berlin(), 3, &CancelToken::new())
        .await
        .expect_err("nothing returned");

    assert!(error.is_not_found());
    assert_eq!(observer.failures().len(), 1);
}
