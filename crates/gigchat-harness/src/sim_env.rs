//! Simulated environment on tokio's clock.

use std::time::Duration;

use gigchat_core::env::Environment;

/// Environment using `tokio::time`.
///
/// Under `#[tokio::test(start_paused = true)]` time only advances when every
/// task is idle, so timeouts fire deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a new simulated environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
