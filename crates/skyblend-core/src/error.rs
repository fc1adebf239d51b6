use thiserror::Error;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("location city cannot be empty")]
    EmptyCity,
    #[error("latitude {value} is outside -90..=90")]
    LatitudeOutOfRange { value: String },
    #[error("longitude {value} is outside -180..=180")]
    LongitudeOutOfRange { value: String },

    #[error("source id cannot be empty")]
    EmptySourceId,
    #[error("invalid condition '{value}', expected one of clear, cloudy, rain, snow, storm, mist, unknown")]
    InvalidCondition { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z) or unix seconds: '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
}

/// Errors that cross the core boundary.
///
/// Per-source fetch failures never appear here; they are absorbed by the
/// orchestrator and reported through the observer instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("no weather data for location '{location}'")]
    NotFound { location: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(location: impl Into<String>) -> Self {
        Self::NotFound {
            location: location.into(),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
