//! # Domain Models
//!
//! Canonical domain types for skyblend weather data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Location`] | Tracked place (city/country or coordinates) |
//! | [`LocationKey`] | Deterministic history key for a location |
//! | [`SourceReading`] | One source's normalized observation |
//! | [`AggregatedRecord`] | Merged observation stored in history |
//! | [`Measurements`] | Numeric field set shared by readings and records |
//! | [`Condition`] | Closed condition enumeration |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants: locations reject blank cities and
//! out-of-range coordinates, readings reject non-finite measurements.

mod location;
mod models;
mod timestamp;

pub use location::{Location, LocationKey};
pub use models::{AggregatedRecord, Condition, Contribution, Measurements, SourceReading};
pub use timestamp::UtcDateTime;
