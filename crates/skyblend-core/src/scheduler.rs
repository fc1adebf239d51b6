//! Periodic, non-overlapping fetch cycles over the tracked locations.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::observer::CycleOutcome;
use crate::service::WeatherService;
use crate::{CancelToken, CoreError, Location, LocationKey};

/// Outcome of one location within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub location: LocationKey,
    #[serde(flatten)]
    pub result: LocationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationResult {
    Completed { outcome: CycleOutcome },
    Failed { error: String },
}

/// Summary of one full pass over every tracked location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub locations: Vec<LocationReport>,
    pub elapsed_ms: u64,
}

impl CycleReport {
    pub fn stored(&self) -> usize {
        self.locations
            .iter()
            .filter(|report| {
                matches!(
                    report.result,
                    LocationResult::Completed { outcome } if outcome.is_stored()
                )
            })
            .count()
    }
}

/// Drives one pass per interval across every tracked location.
///
/// Locations within a pass run concurrently; the next pass starts only
/// after every location of the current one has finished.
#[derive(Debug, Clone)]
pub struct CycleCoordinator {
    service: WeatherService,
    locations: Vec<Location>,
    interval: Duration,
}

impl CycleCoordinator {
    pub fn new(
        service: WeatherService,
        locations: Vec<Location>,
        interval: Duration,
    ) -> Result<Self, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::Misconfigured(String::from(
                "fetch interval must be greater than zero",
            )));
        }
        Ok(Self {
            service,
            locations,
            interval,
        })
    }

    pub fn service(&self) -> &WeatherService {
        &self.service
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs a single pass and waits for every location.
    pub async fn run_cycle(&self, cancel: &CancelToken) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%cycle_id, locations = self.locations.len(), "starting fetch cycle");

        let mut tasks = JoinSet::new();
        for (index, location) in self.locations.iter().enumerate() {
            let service = self.service.clone();
            let location = location.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let result = match service.fetch_and_store(&location, &cancel).await {
                    Ok(outcome) => LocationResult::Completed { outcome },
                    Err(error) => {
                        tracing::error!(
                            location = %location.key(),
                            error = %error,
                            "location pass failed"
                        );
                        LocationResult::Failed {
                            error: error.to_string(),
                        }
                    }
                };
                (
                    index,
                    LocationReport {
                        location: location.key(),
                        result,
                    },
                )
            });
        }

        let mut reports: Vec<(usize, LocationReport)> = Vec::with_capacity(self.locations.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(error) => tracing::error!(%cycle_id, error = %error, "location task aborted"),
            }
        }
        reports.sort_by_key(|(index, _)| *index);

        let report = CycleReport {
            cycle_id,
            locations: reports.into_iter().map(|(_, report)| report).collect(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            %cycle_id,
            stored = report.stored(),
            elapsed_ms = report.elapsed_ms,
            "completed fetch cycle"
        );
        report
    }

    /// Runs passes until `shutdown` is cancelled. The first pass starts
    /// immediately; a pass that overruns the interval delays the next tick
    /// instead of stacking passes. Aged-out history is evicted after every
    /// pass, including for locations that stopped receiving writes.
    pub async fn run(&self, shutdown: CancelToken) {
        if self.locations.is_empty() {
            tracing::warn!("no locations configured; nothing to schedule");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.run_cycle(&shutdown).await;

            let evicted = self.service.store().evict_expired().await;
            if evicted > 0 {
                tracing::debug!(evicted, "evicted expired history");
            }
        }

        tracing::info!("fetch scheduler stopped");
    }
}
