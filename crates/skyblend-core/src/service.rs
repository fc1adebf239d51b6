//! Public operations over the fetch pipeline and the history store.

use std::sync::Arc;

use crate::aggregate::aggregate_readings;
use crate::observer::CycleOutcome;
use crate::orchestrator::FetchOrchestrator;
use crate::store::HistoryStore;
use crate::{AggregatedRecord, CancelToken, CoreError, Location, UtcDateTime};

/// Entry point used by the coordinator and the CLI.
///
/// Cloning shares the orchestrator, the sources' breakers and the store.
#[derive(Debug, Clone)]
pub struct WeatherService {
    orchestrator: Arc<FetchOrchestrator>,
    store: HistoryStore,
}

impl WeatherService {
    pub fn new(orchestrator: FetchOrchestrator, store: HistoryStore) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
        }
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Runs one fetch → aggregate → store pass for `location`.
    ///
    /// A pass where every source failed stores nothing and still succeeds
    /// with [`CycleOutcome::NoData`].
    pub async fn fetch_and_store(
        &self,
        location: &Location,
        cancel: &CancelToken,
    ) -> Result<CycleOutcome, CoreError> {
        let readings = self.orchestrator.collect_readings(location, cancel).await?;
        let key = location.key();

        let outcome = if readings.is_empty() {
            CycleOutcome::NoData
        } else {
            let record =
                aggregate_readings(location, &readings, self.orchestrator.clock().as_ref());
            self.store.write(location, record).await;
            CycleOutcome::Stored {
                contributors: readings.len(),
            }
        };

        self.orchestrator.observer().cycle_completed(&key, outcome);
        Ok(outcome)
    }

    pub async fn get_latest(&self, location: &Location) -> Result<AggregatedRecord, CoreError> {
        self.store.latest(location).await
    }

    pub async fn get_range(
        &self,
        location: &Location,
        from: UtcDateTime,
        to: UtcDateTime,
    ) -> Result<Vec<AggregatedRecord>, CoreError> {
        self.store.range(location, from, to).await
    }

    /// Up to `periods` daily records, fetched live and not stored.
    pub async fn get_forecast(
        &self,
        location: &Location,
        periods: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<AggregatedRecord>, CoreError> {
        let records = self
            .orchestrator
            .collect_forecast(location, periods, cancel)
            .await?;
        if records.is_empty() {
            return Err(CoreError::not_found(location.key().as_str()));
        }
        Ok(records)
    }
}
