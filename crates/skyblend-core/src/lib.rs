//! # Skyblend Core
//!
//! Resilient multi-source weather pipeline: fetch from several unreliable
//! providers, merge into one record per location, keep a bounded history.
//!
//! ## Overview
//!
//! - **Domain models** for locations, per-source readings and aggregated records
//! - **Resilience executor** combining bounded retry, exponential backoff and a
//!   per-source circuit breaker
//! - **Source adapters** for OpenWeatherMap, WeatherAPI and Open-Meteo
//! - **Fetch orchestrator** fanning one location out to every source
//! - **History store** with count and age retention
//! - **Cycle coordinator** running non-overlapping periodic passes
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters and the source-set builder |
//! | [`aggregate`] | Readings → record merge |
//! | [`cancel`] | Cancellation token and call deadline |
//! | [`circuit_breaker`] | Circuit breaker for resilient calls |
//! | [`clock`] | Injectable wall clock |
//! | [`config`] | Environment configuration |
//! | [`domain`] | Domain models (Location, SourceReading, AggregatedRecord) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`observer`] | Failure and outcome sink |
//! | [`orchestrator`] | Concurrent per-location fan-out |
//! | [`resilience`] | Retry + breaker executor |
//! | [`retry`] | Backoff schedule |
//! | [`scheduler`] | Periodic cycle coordinator |
//! | [`service`] | Public weather operations |
//! | [`source`] | Source trait and fetch failures |
//! | [`source_id`] | Source identifiers |
//! | [`store`] | Retention-bounded history |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skyblend_core::{
//!     AppConfig, CancelToken, FetchOrchestrator, HistoryStore, Location, SourceSetBuilder,
//!     SystemClock, TracingObserver, WeatherService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load(None)?;
//!     let sources = SourceSetBuilder::from_config(&config).build()?;
//!     let orchestrator = FetchOrchestrator::new(
//!         sources,
//!         Arc::new(TracingObserver),
//!         Arc::new(SystemClock),
//!         config.fetch_timeout,
//!     );
//!     let service = WeatherService::new(orchestrator, HistoryStore::new(config.retention));
//!
//!     let berlin = Location::coordinates(52.52, 13.405)?;
//!     service.fetch_and_store(&berlin, &CancelToken::new()).await?;
//!     println!("{:?}", service.get_latest(&berlin).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ Cycle Coordinator │  one pass per interval, never overlapping
//! └─────────┬─────────┘
//!           │ per location (concurrent)
//!           ▼
//! ┌───────────────────┐     ┌──────────────────┐
//! │  WeatherService   │────▶│  History Store   │
//! └─────────┬─────────┘     │ (RwLock, retain) │
//!           │               └──────────────────┘
//!           ▼
//! ┌───────────────────┐     ┌──────────────────┐
//! │ Fetch Orchestrator│────▶│   Aggregation    │
//! └─────────┬─────────┘     └──────────────────┘
//!           │ per source (JoinSet)
//!           ▼
//! ┌───────────────────┐     ┌──────────────────┐
//! │  Source Adapter   │────▶│ Resilient Exec.  │
//! │ (WeatherSource)   │     │ retry + breaker  │
//! └───────────────────┘     └────────┬─────────┘
//!                                    ▼
//!                           ┌──────────────────┐
//!                           │   HTTP Client    │
//!                           │ (reqwest/fixture)│
//!                           └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Per-source failures are [`FetchError`]s and never escape the
//! orchestrator; they reach the [`CycleObserver`] instead. Operations that
//! cross the core boundary return [`CoreError`]:
//!
//! ```rust
//! use skyblend_core::{CoreError, FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::RemoteTransient => "retried",
//!         FetchErrorKind::RemoteRejected => "returned immediately",
//!         FetchErrorKind::CircuitOpen => "failed fast",
//!         FetchErrorKind::Cancelled => "interrupted",
//!     }
//! }
//!
//! assert_eq!(describe(&FetchError::transient("503")), "retried");
//! assert!(CoreError::not_found("oslo:no").is_not_found());
//! ```
//!
//! ## Security
//!
//! - API keys come from the environment or an env file only and are never logged
//! - All HTTP requests use TLS via rustls

pub mod adapters;
pub mod aggregate;
pub mod cancel;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod observer;
pub mod orchestrator;
pub mod resilience;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod source_id;
pub mod store;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{OpenMeteoAdapter, OpenWeatherAdapter, SourceSetBuilder, WeatherApiAdapter};

// Aggregation
pub use aggregate::aggregate_readings;

// Cancellation
pub use cancel::{CallContext, CancelToken};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Clock
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration
pub use config::{AppConfig, ConfigError};

// Domain models
pub use domain::{
    AggregatedRecord, Condition, Contribution, Location, LocationKey, Measurements, SourceReading,
    UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    FixtureHttpClient, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Observer
pub use observer::{CycleObserver, CycleOutcome, FailureEvent, RecordingObserver, TracingObserver};

// Orchestration and service
pub use orchestrator::FetchOrchestrator;
pub use service::WeatherService;

// Resilience
pub use resilience::ResilientExecutor;
pub use retry::{Backoff, RetryConfig};

// Scheduling
pub use scheduler::{CycleCoordinator, CycleReport, LocationReport, LocationResult};

// Source contract
pub use source::{CapabilitySet, FetchError, FetchErrorKind, SourceFuture, WeatherSource};
pub use source_id::SourceId;

// Storage
pub use store::{HistoryStore, RetentionPolicy};
