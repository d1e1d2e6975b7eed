//! One-shot session expiry timer.
//!
//! The controller owns exactly one of these; starting a new countdown
//! always aborts the previous one, so at most one expiry task is
//! outstanding per controller instance.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Seconds per configured timeout minute.
const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Debug, Default)]
pub struct SessionTimer {
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_expiry` to run after `timeout_minutes`.
    ///
    /// Cancels any countdown already running. A zero (or negative)
    /// timeout fires on the next scheduler tick.
    pub fn start<F>(&mut self, timeout_minutes: i64, on_expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let timeout =
            Duration::from_secs(timeout_minutes.max(0) as u64 * SECONDS_PER_MINUTE);
        debug!(timeout_minutes, "starting session timer");

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_expiry.await;
        }));
    }

    /// Cancel the pending countdown, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a countdown is currently pending
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
