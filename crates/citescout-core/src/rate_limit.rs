//! Fixed-window call throttle for the graph API.
//!
//! Counts calls and, once the window is full, sleeps for a fixed pause and
//! starts a new window. It does not look at responses: a 429 is not a signal
//! here, only the call count is.
//!
//! The call that finds the window full waits out the pause and resets the
//! count to zero without counting itself, so every window after the first
//! admits `max_calls + 1` calls. The aggregator ticks only before detail
//! lookups; seed records and their edge pages (one request per 1000 edges)
//! are not counted.

use std::time::Duration;

/// Calls allowed per window. Keyless Semantic Scholar access is about
/// 100 requests per 5 minutes.
pub const DEFAULT_MAX_CALLS: u32 = 100;

/// Pause taken when the window is full.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CallThrottle {
    max_calls: u32,
    pause: Duration,
    count: u32,
}

impl Default for CallThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, DEFAULT_PAUSE)
    }
}

impl CallThrottle {
    pub fn new(max_calls: u32, pause: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            pause,
            count: 0,
        }
    }

    /// Calls counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Advance the counter without sleeping.
    ///
    /// Returns `Some(pause)` when the window is full; the counter is then
    /// reset to zero (this call is not counted) and the caller is expected to
    /// wait for `pause`.
    pub fn advance(&mut self) -> Option<Duration> {
        if self.count >= self.max_calls {
            self.count = 0;
            Some(self.pause)
        } else {
            self.count += 1;
            None
        }
    }

    /// Count one call, sleeping first if the window is full.
    ///
    /// `on_pause` runs just before the sleep. Returns `true` if this call paused.
    pub async fn tick(&mut self, on_pause: impl FnOnce(Duration)) -> bool {
        match self.advance() {
            Some(pause) => {
                tracing::info!(
                    pause_secs = pause.as_secs(),
                    max_calls = self.max_calls,
                    "call window full, sleeping"
                );
                on_pause(pause);
                tokio::time::sleep(pause).await;
                true
            }
            None => false,
        }
    }
}
