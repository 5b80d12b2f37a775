//! Bounded retry with exponential backoff.
//!
//! Every remote call and every table write made by a call job goes through a
//! [`RetryPolicy`]. Exhaustion is always surfaced to the caller as a
//! [`RetryError`]; the caller decides what to record.

mod config;
mod policy;

pub use config::RetryConfig;
pub use policy::{RetryError, RetryPolicy};
