use serde::Serialize;
use skyblend_core::SourceId;

use crate::error::CliError;

use super::{App, CommandResult};

#[derive(Debug, Serialize)]
struct SourceSummary {
    id: SourceId,
    capabilities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceSummary>,
    locations: Vec<String>,
    fetch_interval_secs: u64,
    fetch_timeout_secs: u64,
}

pub fn run(app: &App) -> Result<CommandResult, CliError> {
    let sources = app
        .service
        .orchestrator()
        .sources()
        .iter()
        .map(|source| SourceSummary {
            id: source.id(),
            capabilities: source.capabilities().supported(),
        })
        .collect();

    let locations = app
        .config
        .locations
        .iter()
        .map(|location| location.key().to_string())
        .collect();

    CommandResult::ok(SourcesResponseData {
        sources,
        locations,
        fetch_interval_secs: app.config.fetch_interval.as_secs(),
        fetch_timeout_secs: app.config.fetch_timeout.as_secs(),
    })
}
