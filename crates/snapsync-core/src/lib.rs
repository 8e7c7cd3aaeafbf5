//! snapsync-core: Error taxonomy shared by every snapsync crate.
//!
//! This crate provides:
//! - `KnownError`: Every failure snapsync can explain to a user, with a stable code
//! - `Explain`: The capability (code, message, HTTP status, data) API layers render
//! - `ErrorBody`: The JSON shape an explained failure is served as
//! - `ensure_key`: Required-field lookup for parsed API responses

pub mod code;
pub mod error;
pub mod keys;

pub use code::{ErrorCode, UnknownCode};
pub use error::{ErrorBody, Explain, KnownError, Result};
pub use keys::{ensure_key, ensure_str};
