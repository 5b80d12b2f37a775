//! Telephony provider abstraction.
//!
//! This module provides a `CallClient` trait for placing outbound calls and
//! observing them through polling, plus a Twilio-compatible REST backend.

mod twilio;
mod types;

pub use twilio::TwilioClient;
pub use types::*;
