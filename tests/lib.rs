//! Shared fixtures for the behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub use skyblend_core::{
    aggregate_readings, AggregatedRecord, AppConfig, CallContext, CancelToken, CapabilitySet,
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, Condition, CoreError, CycleCoordinator,
    CycleObserver, CycleOutcome, FailureEvent, FetchError, FetchErrorKind, FetchOrchestrator,
    FixtureHttpClient, HistoryStore, HttpError, HttpResponse, Location, ManualClock, Measurements,
    RecordingObserver, RetentionPolicy, RetryConfig, SourceFuture, SourceId, SourceReading,
    SourceSetBuilder, UtcDateTime, WeatherService, WeatherSource,
};
pub use std::sync::Arc;

/// What a [`StubSource`] does once its delay has elapsed.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    Reply { temperature_c: f64, condition: Condition },
    Fail(FetchError),
    /// Never resolves; only a deadline or cancellation ends the call.
    Hang,
}

/// Scriptable in-process source. Forecast requests answer with one reading
/// per day starting at `forecast_start`.
pub struct StubSource {
    id: SourceId,
    behavior: StubBehavior,
    delay: Duration,
    forecast_start: Option<UtcDateTime>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn replying(id: &str, temperature_c: f64, condition: Condition) -> Self {
        Self::new(
            id,
            StubBehavior::Reply {
                temperature_c,
                condition,
            },
        )
    }

    pub fn failing(id: &str, error: FetchError) -> Self {
        Self::new(id, StubBehavior::Fail(error))
    }

    pub fn hanging(id: &str) -> Self {
        Self::new(id, StubBehavior::Hang)
    }

    fn new(id: &str, behavior: StubBehavior) -> Self {
        Self {
            id: SourceId::parse(id).expect("valid source id"),
            behavior,
            delay: Duration::ZERO,
            forecast_start: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_forecast_from(mut self, start: UtcDateTime) -> Self {
        self.forecast_start = Some(start);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reading(&self, observed_at: Option<UtcDateTime>, temperature_c: f64, condition: Condition) -> SourceReading {
        SourceReading::new(
            self.id.clone(),
            observed_at,
            Measurements {
                temperature_c,
                humidity_pct: 50.0,
                wind_speed_ms: 3.0,
                pressure_hpa: 1013.0,
                precip_mm: 0.0,
            },
            condition,
        )
        .expect("finite measurements")
    }

    async fn settle<T>(&self, reply: impl FnOnce(f64, Condition) -> T) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            StubBehavior::Reply {
                temperature_c,
                condition,
            } => Ok(reply(*temperature_c, *condition)),
            StubBehavior::Fail(error) => Err(error.clone()),
            StubBehavior::Hang => std::future::pending().await,
        }
    }
}

impl WeatherSource for StubSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, self.forecast_start.is_some())
    }

    fn current<'a>(&'a self, _location: &'a Location, _ctx: &'a CallContext) -> SourceFuture<'a, SourceReading> {
        Box::pin(self.settle(|temperature_c, condition| {
            self.reading(Some(UtcDateTime::now()), temperature_c, condition)
        }))
    }

    fn forecast<'a>(
        &'a self,
        _location: &'a Location,
        days: usize,
        _ctx: &'a CallContext,
    ) -> SourceFuture<'a, Vec<SourceReading>> {
        Box::pin(async move {
            let Some(start) = self.forecast_start else {
                return Err(FetchError::unsupported(&self.id, "forecast"));
            };
            self.settle(|temperature_c, condition| {
                (0..days)
                    .map(|day| {
                        let at = start.saturating_add(Duration::from_secs(86_400 * day as u64));
                        self.reading(Some(at), temperature_c + day as f64, condition)
                    })
                    .collect()
            })
            .await
        })
    }
}

/// Service over `sources` with a recording observer and an unbounded store.
pub fn service_with(
    sources: Vec<Arc<dyn WeatherSource>>,
    fetch_timeout: Duration,
) -> (WeatherService, Arc<RecordingObserver>) {
    service_sharing(sources, fetch_timeout, HistoryStore::new(RetentionPolicy::unbounded()))
}

/// Service over `sources` writing into an existing `store`.
pub fn service_sharing(
    sources: Vec<Arc<dyn WeatherSource>>,
    fetch_timeout: Duration,
    store: HistoryStore,
) -> (WeatherService, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = FetchOrchestrator::new(
        sources,
        observer.clone(),
        Arc::new(skyblend_core::SystemClock),
        fetch_timeout,
    );
    (WeatherService::new(orchestrator, store), observer)
}

pub fn berlin() -> Location {
    Location::city("Berlin", "DE").expect("valid location")
}

pub fn utc(value: &str) -> UtcDateTime {
    UtcDateTime::parse(value).expect("valid timestamp")
}
