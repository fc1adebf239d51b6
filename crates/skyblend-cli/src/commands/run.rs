use skyblend_core::{CancelToken, CycleCoordinator};

use crate::error::CliError;

use super::App;

/// Runs the coordinator until Ctrl-C.
pub async fn run(app: &App) -> Result<(), CliError> {
    let coordinator = CycleCoordinator::new(
        app.service.clone(),
        app.config.locations.clone(),
        app.config.fetch_interval,
    )?;

    if app.source_ids().is_empty() {
        return Err(CliError::Command(String::from(
            "no sources configured; refusing to start the fetch loop",
        )));
    }

    let shutdown = CancelToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown requested"),
            Err(error) => tracing::error!(error = %error, "failed to listen for Ctrl-C"),
        }
        signal_token.cancel();
    });

    tracing::info!(
        locations = coordinator.locations().len(),
        sources = ?app.source_ids(),
        interval_secs = coordinator.interval().as_secs(),
        "starting fetch loop"
    );
    coordinator.run(shutdown).await;
    Ok(())
}
