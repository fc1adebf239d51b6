use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Location, SourceId, UtcDateTime, ValidationError};

/// Normalized high-level weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Mist,
    #[default]
    Unknown,
}

impl Condition {
    pub const ALL: [Self; 7] = [
        Self::Clear,
        Self::Cloudy,
        Self::Rain,
        Self::Snow,
        Self::Storm,
        Self::Mist,
        Self::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Storm => "storm",
            Self::Mist => "mist",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|condition| condition.as_str() == normalized)
            .ok_or(ValidationError::InvalidCondition { value: normalized })
    }
}

/// The fixed numeric field set shared by readings and aggregated records.
///
/// Adapters report a field they cannot obtain as `0.0`; aggregation still
/// counts it in that field's average.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurements {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub precip_mm: f64,
}

impl Measurements {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_finite("temperature_c", self.temperature_c)?;
        validate_finite("humidity_pct", self.humidity_pct)?;
        validate_finite("wind_speed_ms", self.wind_speed_ms)?;
        validate_finite("pressure_hpa", self.pressure_hpa)?;
        validate_finite("precip_mm", self.precip_mm)?;
        Ok(())
    }
}

/// One source's normalized observation for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub source: SourceId,
    /// `None` when the source did not report an observation time.
    pub observed_at: Option<UtcDateTime>,
    #[serde(flatten)]
    pub measurements: Measurements,
    pub condition: Condition,
}

impl SourceReading {
    pub fn new(
        source: SourceId,
        observed_at: Option<UtcDateTime>,
        measurements: Measurements,
        condition: Condition,
    ) -> Result<Self, ValidationError> {
        measurements.validate()?;
        Ok(Self {
            source,
            observed_at,
            measurements,
            condition,
        })
    }
}

/// Traceability entry for one reading folded into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: SourceId,
    pub observed_at: Option<UtcDateTime>,
}

/// Merged observation for one location at one effective time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub location: Location,
    pub observed_at: UtcDateTime,
    #[serde(flatten)]
    pub measurements: Measurements,
    pub condition: Condition,
    pub contributors: Vec<Contribution>,
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_round_trips_through_str() {
        for condition in Condition::ALL {
            let parsed: Condition = condition.as_str().parse().expect("known condition");
            assert_eq!(parsed, condition);
        }
    }

    #[test]
    fn rejects_unknown_condition_name() {
        let err = "hail".parse::<Condition>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidCondition { .. }));
    }

    #[test]
    fn reading_rejects_nan_measurement() {
        let err = SourceReading::new(
            SourceId::OPEN_METEO,
            None,
            Measurements {
                temperature_c: f64::NAN,
                ..Measurements::default()
            },
            Condition::Clear,
        )
        .expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::NonFiniteValue {
                field: "temperature_c"
            }
        );
    }

    #[test]
    fn reading_serializes_flat_measurements() {
        let reading = SourceReading::new(
            SourceId::WEATHER_API,
            None,
            Measurements {
                temperature_c: 12.5,
                ..Measurements::default()
            },
            Condition::Rain,
        )
        .expect("valid");
        let value = serde_json::to_value(&reading).expect("serializes");
        assert_eq!(value["temperature_c"], 12.5);
        assert_eq!(value["condition"], "rain");
        assert_eq!(value["source"], "weatherapi");
    }
}
