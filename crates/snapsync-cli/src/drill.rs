//! Drill task: a configurable work function for exercising workers.
//!
//! Each cycle logs, optionally fails with a simulated error, and raises the
//! stop sentinel once `max_cycles` cycles have run.

use snapsync_core::KnownError;
use snapsync_worker::{Work, WorkError, WorkerSettings};
use tracing::info;

/// Outcome of the next drill cycle.
fn step(worker: &str, cycle: u64, settings: &WorkerSettings) -> Result<(), WorkError> {
    if settings.max_cycles.is_some_and(|max| cycle > max) {
        return Err(WorkError::Stop);
    }

    info!(worker = %worker, cycle, "Drill cycle");

    match settings.simulate_error {
        Some(code) => Err(KnownError::Simulated(code).into()),
        None => Ok(()),
    }
}

/// Build the work function for one configured worker.
pub fn drill(settings: WorkerSettings) -> impl Work {
    let mut cycle = 0_u64;
    move || {
        cycle += 1;
        let result = step(&settings.name, cycle, &settings);
        async move { result }
    }
}
