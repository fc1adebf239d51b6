mod cycle;
mod forecast;
mod run;
mod sources;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use skyblend_core::{
    AppConfig, FetchOrchestrator, HistoryStore, SourceId, SourceSetBuilder, SystemClock,
    TracingObserver, WeatherService,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata};

/// Result of a one-shot command, before it is wrapped in an [`Envelope`].
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: impl Serialize) -> Result<Self, CliError> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            warnings: Vec::new(),
        })
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Wired pipeline shared by every command.
pub struct App {
    pub config: AppConfig,
    pub service: WeatherService,
}

impl App {
    pub fn build(config: AppConfig) -> Result<Self, CliError> {
        let sources = SourceSetBuilder::from_config(&config).build()?;
        let orchestrator = FetchOrchestrator::new(
            sources,
            Arc::new(TracingObserver),
            Arc::new(SystemClock),
            config.fetch_timeout,
        );
        let service = WeatherService::new(orchestrator, HistoryStore::new(config.retention));
        Ok(Self { config, service })
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.service.orchestrator().source_ids()
    }
}

/// Dispatches the parsed command. Returns `None` for the long-running `run`
/// command, which prints nothing to stdout.
pub async fn run(cli: &Cli) -> Result<Option<Envelope<Value>>, CliError> {
    let config = AppConfig::load(cli.env_file.as_deref())?;
    let app = App::build(config)?;

    let started = Instant::now();
    let result = match &cli.command {
        Command::Run => {
            run::run(&app).await?;
            return Ok(None);
        }
        Command::Cycle => cycle::run(&app).await?,
        Command::Forecast(args) => forecast::run(args, &app).await?,
        Command::Sources => sources::run(&app)?,
    };

    let CommandResult { data, warnings } = result;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = Metadata::new(app.source_ids(), latency_ms);
    if app.source_ids().is_empty() {
        meta.push_warning(
            "no sources configured; set OPENWEATHER_API_KEY, WEATHERAPI_API_KEY or SKYBLEND_OPEN_METEO",
        );
    }
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Some(Envelope { meta, data }))
}
