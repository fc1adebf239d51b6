//! Concurrent fan-out over every configured source for one location.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use time::Date;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::aggregate::aggregate_readings;
use crate::clock::Clock;
use crate::observer::CycleObserver;
use crate::source::{FetchError, WeatherSource};
use crate::{
    AggregatedRecord, CallContext, CancelToken, CoreError, Location, SourceId, SourceReading,
};

/// Fans one location out to every source and gathers the survivors.
///
/// Each source runs in its own task under a shared deadline. A source still
/// running at the deadline fails as transient. Failures are handed to the
/// observer and otherwise dropped; the call always waits for every task
/// before returning.
#[derive(Clone)]
pub struct FetchOrchestrator {
    sources: Vec<Arc<dyn WeatherSource>>,
    observer: Arc<dyn CycleObserver>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("sources", &self.source_ids())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    pub fn new(
        sources: Vec<Arc<dyn WeatherSource>>,
        observer: Arc<dyn CycleObserver>,
        clock: Arc<dyn Clock>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            observer,
            clock,
            fetch_timeout,
        }
    }

    pub fn sources(&self) -> &[Arc<dyn WeatherSource>] {
        &self.sources
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    pub fn observer(&self) -> &Arc<dyn CycleObserver> {
        &self.observer
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current readings from every source that answered, in completion order.
    ///
    /// An empty result is not an error.
    pub async fn collect_readings(
        &self,
        location: &Location,
        cancel: &CancelToken,
    ) -> Result<Vec<SourceReading>, CoreError> {
        if self.sources.is_empty() {
            return Err(CoreError::Misconfigured(String::from(
                "no weather sources configured",
            )));
        }

        let ctx = CallContext::with_timeout(cancel.clone(), self.fetch_timeout);
        let readings = Arc::new(Mutex::new(Vec::with_capacity(self.sources.len())));
        let mut tasks = JoinSet::new();

        for source in &self.sources {
            let source = Arc::clone(source);
            let location = location.clone();
            let ctx = ctx.clone();
            let readings = Arc::clone(&readings);
            let observer = Arc::clone(&self.observer);

            tasks.spawn(async move {
                let outcome = flatten(ctx.run(source.current(&location, &ctx)).await);
                match outcome {
                    Ok(reading) => readings.lock().await.push(reading),
                    Err(error) => observer.source_failed(&source.id(), &location.key(), &error),
                }
            });
        }

        join_all(tasks).await;
        Ok(take(readings).await)
    }

    /// Daily aggregated records from every forecast-capable source.
    ///
    /// Readings are bucketed by UTC calendar day, each bucket is aggregated
    /// on its own and stamped with that day's midnight, and the first
    /// `periods` days are returned in chronological order.
    pub async fn collect_forecast(
        &self,
        location: &Location,
        periods: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<AggregatedRecord>, CoreError> {
        if periods == 0 {
            return Err(CoreError::InvalidArgument(String::from(
                "forecast periods must be at least 1",
            )));
        }

        let capable: Vec<Arc<dyn WeatherSource>> = self
            .sources
            .iter()
            .filter(|source| source.capabilities().forecast)
            .cloned()
            .collect();
        if capable.is_empty() {
            return Err(CoreError::Misconfigured(String::from(
                "no forecast-capable weather sources configured",
            )));
        }

        let ctx = CallContext::with_timeout(cancel.clone(), self.fetch_timeout);
        let readings = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for source in capable {
            let location = location.clone();
            let ctx = ctx.clone();
            let readings = Arc::clone(&readings);
            let observer = Arc::clone(&self.observer);

            tasks.spawn(async move {
                let outcome = flatten(ctx.run(source.forecast(&location, periods, &ctx)).await);
                match outcome {
                    Ok(batch) => readings.lock().await.extend(batch),
                    Err(error) => observer.source_failed(&source.id(), &location.key(), &error),
                }
            });
        }

        join_all(tasks).await;

        let mut buckets: BTreeMap<Date, Vec<SourceReading>> = BTreeMap::new();
        for reading in take(readings).await {
            let Some(observed_at) = reading.observed_at else {
                tracing::debug!(
                    source = %reading.source,
                    location = %location.key(),
                    "dropping forecast reading without timestamp"
                );
                continue;
            };
            buckets.entry(observed_at.date()).or_default().push(reading);
        }

        Ok(buckets
            .into_values()
            .take(periods)
            .map(|bucket| {
                let mut record = aggregate_readings(location, &bucket, self.clock.as_ref());
                record.observed_at = record.observed_at.start_of_day();
                record
            })
            .collect())
    }
}

fn flatten<T>(outcome: Result<Result<T, FetchError>, FetchError>) -> Result<T, FetchError> {
    outcome.and_then(|inner| inner)
}

async fn join_all(mut tasks: JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(error) = joined {
            tracing::error!(error = %error, "source fetch task aborted");
        }
    }
}

async fn take<T>(shared: Arc<Mutex<Vec<T>>>) -> Vec<T> {
    std::mem::take(&mut *shared.lock().await)
}
