//! Pure merge of many source readings into one record.

use crate::clock::Clock;
use crate::{AggregatedRecord, Condition, Contribution, Location, Measurements, SourceReading};

/// Folds `readings` into a single [`AggregatedRecord`] for `location`.
///
/// - every numeric field is the arithmetic mean over all readings, summed
///   in input order; a field a source could not obtain arrives as `0.0` and
///   still counts
/// - the condition is the most frequent one, ties going to the value seen
///   first
/// - the timestamp is the latest reading timestamp, or `clock.now()` when no
///   reading carries one
///
/// An empty slice yields an `unknown`, all-zero record stamped with
/// `clock.now()` and no contributors.
pub fn aggregate_readings(
    location: &Location,
    readings: &[SourceReading],
    clock: &dyn Clock,
) -> AggregatedRecord {
    if readings.is_empty() {
        return AggregatedRecord {
            location: location.clone(),
            observed_at: clock.now(),
            measurements: Measurements::default(),
            condition: Condition::Unknown,
            contributors: Vec::new(),
        };
    }

    let mut sum = Measurements::default();
    for reading in readings {
        let m = &reading.measurements;
        sum.temperature_c += m.temperature_c;
        sum.humidity_pct += m.humidity_pct;
        sum.wind_speed_ms += m.wind_speed_ms;
        sum.pressure_hpa += m.pressure_hpa;
        sum.precip_mm += m.precip_mm;
    }

    let n = readings.len() as f64;
    let measurements = Measurements {
        temperature_c: sum.temperature_c / n,
        humidity_pct: sum.humidity_pct / n,
        wind_speed_ms: sum.wind_speed_ms / n,
        pressure_hpa: sum.pressure_hpa / n,
        precip_mm: sum.precip_mm / n,
    };

    let observed_at = readings
        .iter()
        .filter_map(|reading| reading.observed_at)
        .max()
        .unwrap_or_else(|| clock.now());

    AggregatedRecord {
        location: location.clone(),
        observed_at,
        measurements,
        condition: majority_condition(readings),
        contributors: readings
            .iter()
            .map(|reading| Contribution {
                source: reading.source.clone(),
                observed_at: reading.observed_at,
            })
            .collect(),
    }
}

fn majority_condition(readings: &[SourceReading]) -> Condition {
    // First-seen order is kept so the strict comparison below favours it.
    let mut counts: Vec<(Condition, usize)> = Vec::with_capacity(Condition::ALL.len());
    for reading in readings {
        match counts.iter_mut().find(|(c, _)| *c == reading.condition) {
            Some((_, count)) => *count += 1,
            None => counts.push((reading.condition, 1)),
        }
    }

    let mut best = Condition::Unknown;
    let mut best_count = 0;
    for (condition, count) in counts {
        if count > best_count {
            best = condition;
            best_count = count;
        }
    }
    best
}
