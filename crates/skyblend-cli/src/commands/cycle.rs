use serde::Serialize;
use skyblend_core::{AggregatedRecord, CancelToken, CycleCoordinator, CycleReport};

use crate::error::CliError;

use super::{App, CommandResult};

#[derive(Debug, Serialize)]
struct CycleResponseData {
    report: CycleReport,
    latest: Vec<AggregatedRecord>,
}

pub async fn run(app: &App) -> Result<CommandResult, CliError> {
    if app.config.locations.is_empty() {
        return Err(CliError::Command(String::from(
            "no locations configured; set WEATHER_LOCATION_CITY and WEATHER_LOCATION_COUNTRY",
        )));
    }

    let coordinator = CycleCoordinator::new(
        app.service.clone(),
        app.config.locations.clone(),
        app.config.fetch_interval,
    )?;
    let report = coordinator.run_cycle(&CancelToken::new()).await;

    let mut latest = Vec::with_capacity(app.config.locations.len());
    let mut missing = Vec::new();
    for location in &app.config.locations {
        match app.service.get_latest(location).await {
            Ok(record) => latest.push(record),
            Err(error) if error.is_not_found() => missing.push(location.key()),
            Err(error) => return Err(error.into()),
        }
    }

    let mut result = CommandResult::ok(CycleResponseData { report, latest })?;
    for key in missing {
        result = result.with_warning(format!("no data stored for '{key}'"));
    }
    Ok(result)
}
