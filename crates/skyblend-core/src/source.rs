//! Weather source trait and per-source failure types.
//!
//! This module defines the adapter contract ([`WeatherSource`]) that every
//! weather provider implements, plus the failure taxonomy the resilience
//! executor produces and the orchestrator absorbs.
//!
//! # Capabilities
//!
//! | Capability | Method | Description |
//! |------------|--------|-------------|
//! | Current | [`WeatherSource::current`] | Point-in-time observation |
//! | Forecast | [`WeatherSource::forecast`] | Multi-day readings in one call |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{CallContext, Location, SourceId, SourceReading};

/// Boxed future returned by source adapters.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

/// Supported capability matrix for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub current: bool,
    pub forecast: bool,
}

impl CapabilitySet {
    pub const fn new(current: bool, forecast: bool) -> Self {
        Self { current, forecast }
    }

    pub const fn current_only() -> Self {
        Self::new(true, false)
    }

    pub const fn full() -> Self {
        Self::new(true, true)
    }

    pub fn supported(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(2);
        if self.current {
            values.push("current");
        }
        if self.forecast {
            values.push("forecast");
        }
        values
    }
}

/// Classification of a single source's failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Network error, rate limiting, or server error. Retried.
    RemoteTransient,
    /// Any other unexpected remote outcome. Returned without retry.
    RemoteRejected,
    /// Breaker refused the call without touching the network.
    CircuitOpen,
    /// Deadline elapsed or shutdown requested.
    Cancelled,
}

impl FetchErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoteTransient => "remote_transient",
            Self::RemoteRejected => "remote_rejected",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for FetchErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured per-source failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RemoteTransient, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RemoteRejected, message)
    }

    pub fn circuit_open(source: &SourceId) -> Self {
        Self::new(
            FetchErrorKind::CircuitOpen,
            format!("{source} circuit breaker is open; skipping upstream call"),
        )
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Cancelled, message)
    }

    pub fn unsupported(source: &SourceId, capability: &str) -> Self {
        Self::rejected(format!("{source} does not support {capability}"))
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        matches!(self.kind, FetchErrorKind::RemoteTransient)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::RemoteTransient => "source.remote_transient",
            FetchErrorKind::RemoteRejected => "source.remote_rejected",
            FetchErrorKind::CircuitOpen => "source.circuit_open",
            FetchErrorKind::Cancelled => "source.cancelled",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// Weather source adapter contract.
///
/// Implementations own their resilience executor, so a call here is already
/// retried and breaker-guarded by the time it resolves.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// location's fetch task.
pub trait WeatherSource: Send + Sync {
    /// Returns the source identifier used in contributor metadata.
    fn id(&self) -> SourceId;

    /// Returns the supported capabilities.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetches one current observation for `location`.
    fn current<'a>(
        &'a self,
        location: &'a Location,
        ctx: &'a CallContext,
    ) -> SourceFuture<'a, SourceReading>;

    /// Fetches up to `days` daily readings, ascending by date.
    ///
    /// Sources without forecast support keep this default.
    fn forecast<'a>(
        &'a self,
        location: &'a Location,
        days: usize,
        ctx: &'a CallContext,
    ) -> SourceFuture<'a, Vec<SourceReading>> {
        let _ = (location, days, ctx);
        let id = self.id();
        Box::pin(async move { Err(FetchError::unsupported(&id, "forecast")) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(FetchError::transient("boom").retryable());
        assert!(!FetchError::rejected("nope").retryable());
        assert!(!FetchError::circuit_open(&SourceId::OPEN_METEO).retryable());
        assert!(!FetchError::cancelled("stop").retryable());
    }

    #[test]
    fn circuit_open_is_distinct_from_remote_failure() {
        let error = FetchError::circuit_open(&SourceId::WEATHER_API);
        assert_eq!(error.kind(), FetchErrorKind::CircuitOpen);
        assert_eq!(error.code(), "source.circuit_open");
        assert!(error.message().contains("weatherapi"));
    }

    #[test]
    fn capability_set_lists_supported_entries() {
        assert_eq!(CapabilitySet::full().supported(), vec!["current", "forecast"]);
        assert_eq!(CapabilitySet::current_only().supported(), vec!["current"]);
    }
}
