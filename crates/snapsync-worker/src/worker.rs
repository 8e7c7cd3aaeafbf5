//! Supervised worker loop.

use crate::clock::{Clock, TokioClock};
use crate::error::{Failure, Result, WorkError, WorkerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapsync_core::{ErrorBody, Explain};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// A unit of work run repeatedly by a [`Worker`].
///
/// Any `FnMut() -> impl Future<Output = Result<(), WorkError>>` closure is a
/// `Work`.
pub trait Work: Send + 'static {
    /// Run one iteration.
    fn run(&mut self) -> impl Future<Output = std::result::Result<(), WorkError>> + Send;
}

impl<F, Fut> Work for F
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<(), WorkError>> + Send,
{
    fn run(&mut self) -> impl Future<Output = std::result::Result<(), WorkError>> + Send {
        self()
    }
}

/// Lifecycle of a worker. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Stopped,
}

impl RunState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone)]
struct LastError {
    failure: Arc<Failure>,
    at: DateTime<Utc>,
}

/// State written by the worker task and read by everyone else.
#[derive(Debug)]
struct Shared {
    name: String,
    state: AtomicU8,
    iterations: AtomicU64,
    last_error: RwLock<Option<LastError>>,
}

impl Shared {
    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn record(&self, failure: Failure) {
        let entry = LastError {
            failure: Arc::new(failure),
            at: Utc::now(),
        };
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    fn last_error(&self) -> Option<LastError> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Marks the worker stopped when the task ends, including by panic.
struct StopGuard(Arc<Shared>);

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.0.set_state(RunState::Stopped);
    }
}

/// Read-only view of a worker, cheap to clone and safe to poll from any task.
#[derive(Debug, Clone)]
pub struct WorkerStatus(Arc<Shared>);

impl WorkerStatus {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        RunState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    /// True while the loop is running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Number of times the work function has been invoked.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.0.iterations.load(Ordering::Acquire)
    }

    /// Most recent failure. Successful iterations do not clear it.
    #[must_use]
    pub fn last_error(&self) -> Option<Arc<Failure>> {
        self.0.last_error().map(|e| e.failure)
    }

    /// When the most recent failure was recorded.
    #[must_use]
    pub fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.0.last_error().map(|e| e.at)
    }

    /// Serializable view of the current status.
    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        let last = self.0.last_error();
        WorkerSnapshot {
            name: self.0.name.clone(),
            state: self.state(),
            iterations: self.iterations(),
            last_error: last.as_ref().map(|e| e.failure.body()),
            last_error_at: last.map(|e| e.at),
        }
    }
}

/// Point-in-time status of a worker, as served to the web UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub state: RunState,
    pub iterations: u64,
    pub last_error: Option<ErrorBody>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// A named background task that runs `work` every `interval` until it
/// returns [`WorkError::Stop`].
pub struct Worker<W, C = TokioClock> {
    status: WorkerStatus,
    interval: Duration,
    pending: Option<(W, C)>,
    handle: Option<JoinHandle<()>>,
}

impl<W: Work, C: Clock> Worker<W, C> {
    /// Create a worker. Nothing runs until [`Worker::start`].
    pub fn new(name: impl Into<String>, work: W, clock: C, interval: Duration) -> Self {
        let shared = Shared {
            name: name.into(),
            state: AtomicU8::new(RunState::NotStarted as u8),
            iterations: AtomicU64::new(0),
            last_error: RwLock::new(None),
        };
        Self {
            status: WorkerStatus(Arc::new(shared)),
            interval,
            pending: Some((work, clock)),
            handle: None,
        }
    }

    /// Spawn the worker loop on the current tokio runtime.
    ///
    /// # Errors
    /// Returns `WorkerError::AlreadyStarted` if the worker was started before.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let (work, clock) = self
            .pending
            .take()
            .ok_or_else(|| WorkerError::AlreadyStarted(self.name().to_string()))?;

        let shared = Arc::clone(&self.status.0);
        shared.set_state(RunState::Running);
        let guard = StopGuard(Arc::clone(&shared));
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let _guard = guard;
            run_loop(&shared, work, clock, interval).await;
        }));
        Ok(())
    }

    /// Wait for the loop to stop.
    ///
    /// Joining an already joined worker returns immediately.
    ///
    /// # Errors
    /// Returns `WorkerError::NotStarted` before `start`,
    /// `WorkerError::Panicked` if the work function panicked, or
    /// `WorkerError::Cancelled` if the runtime dropped the task.
    pub async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return match self.state() {
                RunState::NotStarted => Err(WorkerError::NotStarted(self.name().to_string())),
                _ => Ok(()),
            };
        };

        handle
            .await
            .map_err(|err| join_failure(self.name(), err))
    }
}

/// Classify why a worker task ended without finishing its loop.
fn join_failure(name: &str, err: JoinError) -> WorkerError {
    let name = name.to_string();
    if !err.is_panic() {
        return WorkerError::Cancelled(name);
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    WorkerError::Panicked { name, message }
}

impl<W, C> Worker<W, C> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.status.name()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.status.state()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.status.iterations()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<Arc<Failure>> {
        self.status.last_error()
    }

    #[must_use]
    pub fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.status.last_error_at()
    }

    /// A handle other tasks can poll after the worker is moved or started.
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        self.status.snapshot()
    }
}

async fn run_loop<W: Work, C: Clock>(shared: &Shared, mut work: W, clock: C, interval: Duration) {
    let name = shared.name.as_str();
    info!(worker = %name, interval = ?interval, "Worker started");

    loop {
        let iteration = shared.iterations.fetch_add(1, Ordering::AcqRel) + 1;

        match work.run().await {
            Ok(()) => debug!(worker = %name, iteration, "Work completed"),
            Err(WorkError::Stop) => {
                info!(worker = %name, iteration, "Worker stopping");
                break;
            }
            Err(WorkError::Failed(failure)) => {
                match &failure {
                    Failure::Known(err) => {
                        warn!(worker = %name, iteration, code = %err.code(), error = %err, "Work failed");
                    }
                    Failure::Other(err) => {
                        error!(worker = %name, iteration, error = ?err, "Work failed with an unclassified error");
                    }
                }
                shared.record(failure);
            }
        }

        clock.sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use pretty_assertions::assert_eq;
    use snapsync_core::{ErrorCode, KnownError};
    use std::io;
    use std::sync::atomic::AtomicUsize;

    type WorkResult = std::result::Result<(), WorkError>;

    async fn explode() -> WorkResult {
        panic!("work exploded")
    }

    /// Counts up to `limit`, then raises the stop sentinel.
    fn counting_work(count: Arc<AtomicUsize>, limit: usize, fail: bool) -> impl Work {
        move || {
            let count = Arc::clone(&count);
            async move {
                if count.load(Ordering::SeqCst) >= limit {
                    return Err(WorkError::Stop);
                }
                count.fetch_add(1, Ordering::SeqCst);
                if fail {
                    return Err(anyhow::Error::from(io::Error::other("disk unplugged")).into());
                }
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_worker_runs_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let clock = FakeClock::new();
        let mut worker = Worker::new(
            "test",
            counting_work(Arc::clone(&count), 5, false),
            clock.clone(),
            Duration::from_secs(1),
        );

        worker.start().unwrap();
        worker.join().await.unwrap();

        assert!(!worker.is_alive());
        assert_eq!(worker.state(), RunState::Stopped);
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 5]);
        assert_eq!(worker.name(), "test");
        assert_eq!(worker.iterations(), 6);
        assert!(worker.last_error().is_none());
        assert!(worker.last_error_at().is_none());
    }

    #[tokio::test]
    async fn test_worker_records_errors() {
        let count = Arc::new(AtomicUsize::new(0));
        let clock = FakeClock::new();
        let mut worker = Worker::new(
            "test",
            counting_work(Arc::clone(&count), 5, true),
            clock.clone(),
            Duration::from_secs(1),
        );

        worker.start().unwrap();
        worker.join().await.unwrap();

        assert!(!worker.is_alive());
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 5]);
        assert_eq!(worker.name(), "test");

        let last = worker.last_error().expect("last error recorded");
        match last.as_ref() {
            Failure::Other(err) => {
                let io_err = err.downcast_ref::<io::Error>().expect("io error");
                assert_eq!(io_err.to_string(), "disk unplugged");
            }
            Failure::Known(err) => panic!("Expected unclassified failure, got {err:?}"),
        }
        assert!(worker.last_error_at().is_some());
    }

    #[tokio::test]
    async fn test_sleeps_one_fewer_than_invocations() {
        for n in 1..=6_usize {
            let clock = FakeClock::new();
            let mut calls = 0_usize;
            let mut worker = Worker::new(
                "sequence",
                move || {
                    calls += 1;
                    let done = calls == n;
                    async move {
                        if done {
                            Err(WorkError::Stop)
                        } else {
                            Ok(())
                        }
                    }
                },
                clock.clone(),
                Duration::from_millis(250),
            );

            worker.start().unwrap();
            worker.join().await.unwrap();

            assert_eq!(clock.sleeps().len(), n - 1);
            assert_eq!(worker.iterations(), n as u64);
            assert_eq!(worker.state(), RunState::Stopped);
            assert!(worker.last_error().is_none());
        }
    }

    #[tokio::test]
    async fn test_last_error_is_most_recent() {
        let mut calls = 0_u32;
        let mut worker = Worker::new(
            "sync",
            move || {
                calls += 1;
                let call = calls;
                async move {
                    let result: WorkResult = match call {
                        1 => Err(KnownError::GoogleTimeout.into()),
                        2 => Err(KnownError::GoogleCantConnect.into()),
                        3 => Err(KnownError::DriveQuotaExceeded.into()),
                        _ => Err(WorkError::Stop),
                    };
                    result
                }
            },
            FakeClock::new(),
            Duration::from_secs(60),
        );

        worker.start().unwrap();
        worker.join().await.unwrap();

        let last = worker.last_error().unwrap();
        assert_eq!(last.known(), Some(&KnownError::DriveQuotaExceeded));
    }

    #[tokio::test]
    async fn test_success_does_not_clear_last_error() {
        let mut calls = 0_u32;
        let mut worker = Worker::new(
            "sync",
            move || {
                calls += 1;
                let call = calls;
                async move {
                    let result: WorkResult = match call {
                        1 => Err(KnownError::UploadFailed.into()),
                        2..=4 => Ok(()),
                        _ => Err(WorkError::Stop),
                    };
                    result
                }
            },
            FakeClock::new(),
            Duration::from_secs(60),
        );

        worker.start().unwrap();
        worker.join().await.unwrap();

        let last = worker.last_error().unwrap();
        assert_eq!(last.known(), Some(&KnownError::UploadFailed));
    }

    #[tokio::test]
    async fn test_stop_sentinel_never_recorded() {
        let clock = FakeClock::new();
        let mut worker = Worker::new(
            "stop",
            || async { WorkResult::Err(WorkError::Stop) },
            clock.clone(),
            Duration::from_secs(1),
        );

        worker.start().unwrap();
        worker.join().await.unwrap();

        assert!(worker.last_error().is_none());
        assert!(clock.sleeps().is_empty());
        assert_eq!(worker.iterations(), 1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut worker = Worker::new(
            "twice",
            || async { WorkResult::Err(WorkError::Stop) },
            FakeClock::new(),
            Duration::from_secs(1),
        );

        worker.start().unwrap();
        let err = worker.start().unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyStarted(ref name) if name == "twice"));

        worker.join().await.unwrap();
        // Joining again is a no-op once stopped.
        worker.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_join_before_start_fails() {
        let mut worker = Worker::new(
            "idle",
            || async { WorkResult::Ok(()) },
            FakeClock::new(),
            Duration::from_secs(1),
        );

        assert_eq!(worker.state(), RunState::NotStarted);
        assert!(!worker.is_alive());
        assert!(matches!(
            worker.join().await,
            Err(WorkerError::NotStarted(_))
        ));
    }

    #[tokio::test]
    async fn test_panicking_work_stops_worker() {
        let mut worker = Worker::new(
            "boom",
            explode,
            FakeClock::new(),
            Duration::from_secs(1),
        );

        worker.start().unwrap();
        let err = worker.join().await.unwrap_err();

        match err {
            WorkerError::Panicked { name, message } => {
                assert_eq!(name, "boom");
                assert_eq!(message, "work exploded");
            }
            other => panic!("Expected Panicked, got {other:?}"),
        }
        assert_eq!(worker.state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn test_cancelled_task_is_not_a_panic() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = handle.await.unwrap_err();

        match join_failure("sync", err) {
            WorkerError::Cancelled(name) => assert_eq!(name, "sync"),
            other => panic!("Expected Cancelled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_handle_reflects_worker() {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let mut release_rx = Some(release_rx);
        let mut worker = Worker::new(
            "sync",
            move || {
                let rx = release_rx.take();
                async move {
                    let result: WorkResult = match rx {
                        Some(rx) => {
                            let _ = rx.await;
                            Err(KnownError::MultipleBackupFolders { count: 2 }.into())
                        }
                        None => Err(WorkError::Stop),
                    };
                    result
                }
            },
            FakeClock::new(),
            Duration::from_secs(1),
        );
        let status = worker.status();

        worker.start().unwrap();
        assert!(status.is_alive());
        assert_eq!(status.state(), RunState::Running);

        release_tx.send(()).unwrap();
        worker.join().await.unwrap();

        let snapshot = status.snapshot();
        assert_eq!(snapshot.name, "sync");
        assert_eq!(snapshot.state, RunState::Stopped);
        assert_eq!(snapshot.iterations, 2);
        let body = snapshot.last_error.unwrap();
        assert_eq!(body.code, ErrorCode::MultipleFolders);
        assert_eq!(body.data, serde_json::json!({"count": 2}));
        assert!(snapshot.last_error_at.is_some());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = WorkerSnapshot {
            name: "sync".to_string(),
            state: RunState::NotStarted,
            iterations: 0,
            last_error: None,
            last_error_at: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""state":"not_started""#));
        assert!(json.contains(r#""last_error":null"#));
    }
}
