use std::time::{Duration, Instant};

use crossbeam_channel::{never, tick, Receiver};

/// Periodic tick source that only runs while the connection is open.
///
/// A stopped poller hands out a channel that never fires, so it can sit in a
/// `select!` unconditionally.
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    ticks: Receiver<Instant>,
    running: bool,
}

impl Poller {
    /// Creates a stopped poller.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticks: never(),
            running: false,
        }
    }

    /// Starts ticking. Restarting a running poller is a no-op.
    pub fn start(&mut self) {
        if !self.running {
            self.ticks = tick(self.interval);
            self.running = true;
        }
    }

    /// Stops ticking. Pending ticks are discarded.
    pub fn stop(&mut self) {
        self.ticks = never();
        self.running = false;
    }

    /// Channel to select on.
    #[must_use]
    pub const fn ticks(&self) -> &Receiver<Instant> {
        &self.ticks
    }

    /// Returns true while ticking.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
