use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A tracked place: either a city/country pair or a coordinate pair.
///
/// When both are present the coordinates win for keying, so two requests for
/// the same coordinates always land in the same history regardless of the
/// city spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Location {
    /// City/country location. Country may be empty.
    pub fn city(city: &str, country: &str) -> Result<Self, ValidationError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ValidationError::EmptyCity);
        }

        Ok(Self {
            city: city.to_owned(),
            country: country.trim().to_owned(),
            lat: None,
            lon: None,
        })
    }

    pub fn coordinates(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        validate_coordinates(lat, lon)?;
        Ok(Self {
            city: String::new(),
            country: String::new(),
            lat: Some(lat),
            lon: Some(lon),
        })
    }

    /// Attach coordinates to a named location.
    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Result<Self, ValidationError> {
        validate_coordinates(lat, lon)?;
        self.lat = Some(lat);
        self.lon = Some(lon);
        Ok(self)
    }

    pub fn coords(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    /// Canonical store key. Total and deterministic for every location value.
    ///
    /// Coordinates are rounded to four decimals with signed zero folded
    /// into zero. A `:` or `%` inside a name is percent-escaped so the
    /// separator stays unambiguous.
    pub fn key(&self) -> LocationKey {
        if let Some((lat, lon)) = self.coords() {
            let (lat, lon) = (key_coordinate(lat), key_coordinate(lon));
            return LocationKey(format!("lat={lat:.4},lon={lon:.4}"));
        }

        LocationKey(format!(
            "{}:{}",
            key_component(&self.city),
            key_component(&self.country)
        ))
    }

    /// `city,country` query form accepted by the keyed providers.
    pub fn query(&self) -> String {
        if let Some((lat, lon)) = self.coords() {
            return format!("{lat:.4},{lon:.4}");
        }
        if self.country.is_empty() {
            self.city.clone()
        } else {
            format!("{},{}", self.city, self.country)
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key().as_str())
    }
}

fn key_coordinate(value: f64) -> f64 {
    // Adding 0.0 turns -0.0 into 0.0.
    (value * 10_000.0).round() / 10_000.0 + 0.0
}

fn key_component(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace('%', "%25")
        .replace(':', "%3a")
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() {
        return Err(ValidationError::NonFiniteValue { field: "lat" });
    }
    if !lon.is_finite() {
        return Err(ValidationError::NonFiniteValue { field: "lon" });
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::LatitudeOutOfRange {
            value: lat.to_string(),
        });
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::LongitudeOutOfRange {
            value: lon.to_string(),
        });
    }
    Ok(())
}

/// Normalized history key derived from [`Location::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Location> for LocationKey {
    fn from(value: &Location) -> Self {
        value.key()
    }
}
