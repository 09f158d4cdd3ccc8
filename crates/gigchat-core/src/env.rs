//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from the system clock. Production uses
//! `std::time::Instant`; tests use paused tokio time.

use std::{ops::Sub, time::Duration};

/// Abstract environment providing time and async sleep.
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleep for the specified duration.
    ///
    /// Only driver code awaits this; state machines take `now` as input.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
