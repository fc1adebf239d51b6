use serde::Serialize;
use skyblend_core::{AggregatedRecord, CancelToken, Location, LocationKey};

use crate::cli::ForecastArgs;
use crate::error::CliError;

use super::{App, CommandResult};

#[derive(Debug, Serialize)]
struct ForecastResponseData {
    location: LocationKey,
    days: Vec<AggregatedRecord>,
}

pub async fn run(args: &ForecastArgs, app: &App) -> Result<CommandResult, CliError> {
    let location = location_from_args(args)?;
    let days = app
        .service
        .get_forecast(&location, args.days, &CancelToken::new())
        .await?;

    let mut result = CommandResult::ok(ForecastResponseData {
        location: location.key(),
        days,
    })?;
    if let Some(returned) = short_by(args.days, &result) {
        result = result.with_warning(format!(
            "sources covered {returned} of {} requested days",
            args.days
        ));
    }
    Ok(result)
}

fn location_from_args(args: &ForecastArgs) -> Result<Location, CliError> {
    let country = args.country.as_deref().unwrap_or_default();
    let location = match (args.city.as_deref(), args.lat, args.lon) {
        (Some(city), Some(lat), Some(lon)) => {
            Location::city(city, country)?.with_coordinates(lat, lon)?
        }
        (Some(city), _, _) => Location::city(city, country)?,
        (None, Some(lat), Some(lon)) => Location::coordinates(lat, lon)?,
        _ => {
            return Err(CliError::Command(String::from(
                "forecast needs --city or both --lat and --lon",
            )))
        }
    };
    Ok(location)
}

fn short_by(requested: usize, result: &CommandResult) -> Option<usize> {
    let returned = result.data.get("days")?.as_array()?.len();
    (returned < requested).then_some(returned)
}
