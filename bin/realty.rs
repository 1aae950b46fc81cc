use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use realty::{Pipeline, PostgresClient, Settings};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::new()
        .context("Failed to load configuration from config.yaml / REALTY__* environment")?;

    SimpleLogger::new()
        .with_level(settings.log_level())
        .init()
        .context("Failed to initialize logger")?;

    let db = Arc::new(
        PostgresClient::new(settings.postgres.clone())
            .await
            .context("Failed to initialize database connection")?,
    );
    db.ensure_schema().await?;

    let pipeline = Pipeline::new(db, settings.loader.snapshot_dir.clone());
    let cancellation_token = CancellationToken::new();

    info!("Start saving files...");
    let run_token = cancellation_token.clone();
    let mut run_handle = tokio::spawn(async move { pipeline.run(run_token).await });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    #[cfg(unix)]
    let finished = tokio::select! {
        res = &mut run_handle => Some(res),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), finishing current file...");
            None
        },
        _ = sigterm_stream.recv() => {
            info!("Received SIGTERM, finishing current file...");
            None
        },
    };

    #[cfg(not(unix))]
    let finished = tokio::select! {
        res = &mut run_handle => Some(res),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), finishing current file...");
            None
        },
    };

    let result = match finished {
        Some(res) => res,
        None => {
            // The in-flight transaction resolves before the loop sees this
            cancellation_token.cancel();
            run_handle.await
        },
    };

    let summary = result
        .context("Loader task panicked")?
        .context("Loader run failed")?;

    for (snapshot, err) in &summary.skipped {
        warn!("Not loaded: {} ({})", snapshot, err.kind());
    }

    if summary.cancelled {
        info!("Stopped early; remaining snapshots will be picked up by the next run");
    }

    if !summary.skipped.is_empty() {
        error!("{} snapshot(s) failed to load", summary.skipped.len());
    }

    Ok(())
}
