use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Identifier of a weather source, used in contributor metadata and logs.
///
/// The set is open: the bundled adapters use the constants below, tests and
/// downstream adapters may mint their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(Cow<'static, str>);

impl SourceId {
    pub const OPEN_WEATHER: Self = Self(Cow::Borrowed("openweathermap"));
    pub const WEATHER_API: Self = Self(Cow::Borrowed("weatherapi"));
    pub const OPEN_METEO: Self = Self(Cow::Borrowed("openmeteo"));

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySourceId);
        }
        Ok(Self(Cow::Owned(normalized)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for SourceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0.into_owned()
    }
}
