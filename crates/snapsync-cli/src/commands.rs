//! CLI command implementations.

use crate::drill::drill;
use crate::output::{self, CodeRow, OutputFormat};
use anyhow::{Context, Result};
use snapsync_core::ErrorCode;
use snapsync_worker::{ConfigError, SyncConfig, TokioClock, Worker, WorkerSnapshot, WorkerStatus};
use std::path::Path;
use tracing::{error, info, warn};

/// Load and validate the config file.
fn load_config(path: &Path) -> std::result::Result<SyncConfig, ConfigError> {
    let config = SyncConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Run every configured worker until all of them stop or Ctrl-C.
pub fn run(path: &Path, no_status: bool, format: OutputFormat) -> Result<()> {
    let config = load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    let rt = tokio::runtime::Runtime::new()?;
    let snapshots = rt.block_on(run_async(config, no_status))?;

    output::print_list(&snapshots, format);
    Ok(())
}

async fn run_async(config: SyncConfig, no_status: bool) -> Result<Vec<WorkerSnapshot>> {
    let mut workers: Vec<_> = config
        .workers
        .iter()
        .map(|settings| {
            Worker::new(
                settings.name.clone(),
                drill(settings.clone()),
                TokioClock,
                settings.interval(),
            )
        })
        .collect();

    for worker in &mut workers {
        worker.start()?;
    }
    let statuses: Vec<_> = workers.iter().map(Worker::status).collect();

    let status = config.status;
    let serve_status = status.enabled && !no_status;
    let server = {
        let statuses = statuses.clone();
        async move {
            if serve_status {
                snapsync_status::serve(statuses, &status.host, status.port).await
            } else {
                std::future::pending().await
            }
        }
    };

    let wait_all = async {
        for worker in &mut workers {
            if let Err(err) = worker.join().await {
                error!(worker = %worker.name(), error = %err, "Worker ended abnormally");
            }
        }
    };

    tokio::select! {
        () = wait_all => info!("All workers stopped"),
        result = server => result.context("Status server failed")?,
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, abandoning running workers"),
    }

    Ok(statuses.iter().map(WorkerStatus::snapshot).collect())
}

/// Validate the config file and report the first problem.
pub fn check(path: &Path, format: OutputFormat) -> Result<()> {
    match load_config(path) {
        Ok(config) => {
            output::print_success(
                &format!(
                    "{} is valid ({} worker(s))",
                    path.display(),
                    config.workers.len()
                ),
                format,
            );
            Ok(())
        }
        Err(err) => {
            output::print(&err.body(), format);
            Err(err).with_context(|| format!("Invalid config at {}", path.display()))
        }
    }
}

/// List every registered error code.
pub fn codes(format: OutputFormat) {
    let rows: Vec<_> = ErrorCode::ALL
        .iter()
        .map(|code| CodeRow {
            code: code.as_str(),
        })
        .collect();
    output::print_list(&rows, format);
}
