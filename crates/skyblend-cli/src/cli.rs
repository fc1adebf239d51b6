//! CLI argument definitions for skyblend.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Start the periodic fetch loop until Ctrl-C |
//! | `cycle` | Run one fetch pass and print the latest records |
//! | `forecast` | Aggregate a multi-day forecast for one location |
//! | `sources` | List configured sources and their capabilities |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--env-file` | `.env` if present | Env file merged under the process environment |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-json` | `false` | Emit logs as JSON lines on stderr |
//!
//! # Examples
//!
//! ```bash
//! # One pass over WEATHER_LOCATION_CITY / WEATHER_LOCATION_COUNTRY
//! skyblend cycle --pretty
//!
//! # Three-day forecast by coordinates
//! skyblend forecast --lat 52.52 --lon 13.405 --days 3
//!
//! # Long-running loop with JSON logs
//! RUST_LOG=skyblend=debug skyblend run --log-json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Multi-source weather aggregation CLI.
#[derive(Debug, Parser)]
#[command(
    name = "skyblend",
    author,
    version,
    about = "Multi-source weather aggregation",
    long_about = "skyblend fetches current conditions from several weather providers \
concurrently, merges them into one record per location and keeps a bounded history.\n\
\n\
Providers are enabled through the environment: OPENWEATHER_API_KEY, WEATHERAPI_API_KEY \
and SKYBLEND_OPEN_METEO.\n\
\n\
Use 'skyblend <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Env file to merge under the process environment.
    ///
    /// Defaults to `.env` in the working directory when it exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the fetch loop for every configured location.
    ///
    /// Runs one pass per FETCH_INTERVAL; passes never overlap. Ctrl-C stops
    /// the loop after the in-flight pass is cancelled.
    Run,

    /// Run a single fetch pass and print the latest record per location.
    ///
    /// Example: skyblend cycle --pretty
    Cycle,

    /// Fetch and aggregate a daily forecast for one location.
    ///
    /// Examples:
    ///   skyblend forecast --city Berlin --country DE --days 3
    ///   skyblend forecast --lat 59.91 --lon 10.75
    Forecast(ForecastArgs),

    /// List configured sources and their capabilities.
    Sources,
}

#[derive(Debug, Args)]
pub struct ForecastArgs {
    /// City name.
    #[arg(long, required_unless_present = "lat")]
    pub city: Option<String>,

    /// Country code accompanying --city.
    #[arg(long, requires = "city")]
    pub country: Option<String>,

    /// Latitude in decimal degrees.
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Number of days to forecast.
    #[arg(long, default_value_t = 3)]
    pub days: usize,
}
