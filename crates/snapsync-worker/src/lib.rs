//! Supervised background workers for snapsync.
//!
//! A [`Worker`] runs a work function on a fixed cadence until the work
//! function raises [`WorkError::Stop`]. Every other failure is recorded as
//! the worker's last error and the loop carries on.
//!
//! - `clock`: Injectable time source ([`TokioClock`], [`FakeClock`])
//! - `config`: `snapsync.yml` loading and validation
//! - `worker`: The supervised loop and its read-only [`WorkerStatus`] handle

pub mod clock;
pub mod config;
pub mod error;
pub mod worker;

pub use clock::{Clock, FakeClock, TokioClock};
pub use config::{StatusSettings, SyncConfig, WorkerSettings};
pub use error::{ConfigError, Failure, Result, WorkError, WorkerError};
pub use worker::{RunState, Work, Worker, WorkerSnapshot, WorkerStatus};
