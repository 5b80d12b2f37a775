//! Interval pollers for asynchronous provider state.
//!
//! The provider only exposes call progress and recording availability by
//! polling. Both pollers share one loop that checks at a fixed interval and
//! gives up once the ceiling, measured from the first check, has elapsed.
//! Transport errors are logged and polling continues until that ceiling.

mod recording;
mod status;

pub use recording::{RecordingOutcome, RecordingPoller};
pub use status::{CallOutcome, CallStatusPoller};

use std::future::Future;
use std::time::Duration;

/// Run `check` every `interval` until it yields a value or `ceiling` elapses.
///
/// The first check runs immediately. Returns `None` on timeout; the check
/// future in flight at that moment is dropped.
async fn poll_until<T, F, Fut>(interval: Duration, ceiling: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let polling = async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(interval).await;
        }
    };

    tokio::time::timeout(ceiling, polling).await.ok()
}
