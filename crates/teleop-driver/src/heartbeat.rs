//! Connection Monitor - tracks how long ago the arm last published anything
//!
//! Time is stored as microseconds since the monitor was created, so the
//! value fits in an `AtomicU64` and is unaffected by wall-clock changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Connection health monitor
///
/// The RX thread calls [`register_feedback`](Self::register_feedback) for
/// every state update; any thread may query liveness without locking.
pub struct ConnectionMonitor {
    anchor: Instant,
    last_feedback: AtomicU64,
    /// Set once the first update has arrived
    seen_feedback: AtomicU64,
    timeout: Duration,
}

impl ConnectionMonitor {
    /// Create a new connection monitor
    ///
    /// # Example
    /// ```
    /// # use teleop_driver::ConnectionMonitor;
    /// # use std::time::Duration;
    /// let monitor = ConnectionMonitor::new(Duration::from_millis(500));
    /// assert!(monitor.check_connection());
    /// ```
    pub fn new(timeout: Duration) -> Self {
        Self {
            anchor: Instant::now(),
            last_feedback: AtomicU64::new(0),
            seen_feedback: AtomicU64::new(0),
            timeout,
        }
    }

    fn now_micros(&self) -> u64 {
        self.anchor.elapsed().as_micros() as u64
    }

    /// Returns true if feedback was received within the timeout window
    ///
    /// A fresh monitor counts as alive until the first timeout elapses.
    pub fn check_connection(&self) -> bool {
        self.time_since_last_feedback() < self.timeout
    }

    /// Register that the arm published a state update
    pub fn register_feedback(&self) {
        self.last_feedback.store(self.now_micros(), Ordering::Relaxed);
        self.seen_feedback.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of updates registered so far
    pub fn feedback_count(&self) -> u64 {
        self.seen_feedback.load(Ordering::Relaxed)
    }

    /// Time since last feedback (or since creation if none yet)
    pub fn time_since_last_feedback(&self) -> Duration {
        let last_us = self.last_feedback.load(Ordering::Relaxed);
        Duration::from_micros(self.now_micros().saturating_sub(last_us))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
