//! Catalog indexer entry point.
//!
//! Loads `.env`, initialises logging, wires the stores and runs sync passes
//! until Ctrl-C or SIGTERM.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog_indexer::config::LogFormat;
use catalog_indexer::{Dependencies, IndexingError, SyncSettings};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolves once the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run(settings: SyncSettings) -> Result<(), IndexingError> {
    let dependencies = Dependencies::new(&settings).await?;
    let orchestrator = dependencies.orchestrator;

    let handle = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested, finishing current pass");
        handle.shutdown();
    });

    orchestrator.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match SyncSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(settings.log_format);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting catalog indexer");

    match run(settings).await {
        Ok(()) => {
            info!("Catalog indexer stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Catalog indexer failed");
            ExitCode::FAILURE
        }
    }
}
