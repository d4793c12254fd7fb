//! Rate-limited logging of presence events.
//!
//! Each permitted attempt writes to two independent sinks: the durable record
//! store and the remote append endpoint. The gate only advances when the
//! remote endpoint confirms; a durable write alone does not count. A failed
//! remote call therefore leaves the gate open for the next transition, while
//! the durable store is written on every permitted attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::effects::EffectExecutor;
use crate::reading::Reading;
use crate::sinks::{LogRecord, RecordStore, RemoteLog, RemoteLogEntry};
use crate::status::StatusBoard;
use crate::time::display_time;

/// Tracks when logging was last accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGate {
    last_accepted: Option<DateTime<Utc>>,
    min_interval: Duration,
}

impl LogGate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_accepted: None,
            min_interval,
        }
    }

    /// Returns true if a log may be emitted at `now`.
    #[must_use]
    pub fn permits(&self, now: DateTime<Utc>) -> bool {
        self.last_accepted.map_or(true, |last| now - last >= self.min_interval)
    }

    /// Records a confirmed log at `at`. An older confirmation never rewinds the gate.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        if self.last_accepted.map_or(true, |last| at > last) {
            self.last_accepted = Some(at);
        }
    }

    /// Forgets the last confirmation.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    /// When the last confirmed log happened.
    #[must_use]
    pub const fn last_accepted(&self) -> Option<DateTime<Utc>> {
        self.last_accepted
    }

    /// Configured minimum spacing.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Outcome of [`LogRateLimiter::attempt_log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAttempt {
    /// The gate was closed; nothing was written.
    Suppressed,
    /// Both sink writes were submitted.
    Dispatched,
}

/// Gate plus the two log sinks.
#[derive(Clone)]
pub struct LogRateLimiter {
    gate: Arc<Mutex<LogGate>>,
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteLog>,
    status: Arc<StatusBoard>,
    executor: EffectExecutor,
}

impl LogRateLimiter {
    /// Creates a limiter with an open gate.
    pub fn new(
        min_interval: Duration,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteLog>,
        status: Arc<StatusBoard>,
        executor: EffectExecutor,
    ) -> Self {
        Self {
            gate: Arc::new(Mutex::new(LogGate::new(min_interval))),
            store,
            remote,
            status,
            executor,
        }
    }

    /// Logs `reading` if the gate permits it at `now`.
    pub fn attempt_log(&self, reading: Reading, now: DateTime<Utc>) -> LogAttempt {
        if !lock_gate(&self.gate).permits(now) {
            debug!(%reading, "log suppressed by rate limit");
            return LogAttempt::Suppressed;
        }

        let store = Arc::clone(&self.store);
        let status = Arc::clone(&self.status);
        let record = LogRecord::new(reading, now);
        self.executor.submit("record_store", move || match store.append_record(&record) {
            Ok(()) => {
                let line = format!("Last logged at: {}", display_time(record.timestamp));
                status.update(|s| s.last_log_time = line);
                debug!("record stored");
            }
            Err(err) => warn!(error = %err, "record store logging failed"),
        });

        let remote = Arc::clone(&self.remote);
        let gate = Arc::clone(&self.gate);
        let entry = RemoteLogEntry::new(reading, now);
        self.executor.submit("remote_log", move || match remote.append_remote(&entry) {
            Ok(()) => {
                lock_gate(&gate).confirm(now);
                info!(timestamp = %entry.timestamp, "remote log accepted");
            }
            Err(err) => warn!(error = %err, "remote logging failed; gate left open"),
        });

        LogAttempt::Dispatched
    }

    /// Reopens the gate.
    pub fn reset(&self) {
        lock_gate(&self.gate).reset();
    }

    /// Copy of the gate state.
    #[must_use]
    pub fn gate(&self) -> LogGate {
        lock_gate(&self.gate).clone()
    }
}

// Poisoning is ignored: every gate mutation is a single assignment.
fn lock_gate(gate: &Mutex<LogGate>) -> MutexGuard<'_, LogGate> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for LogRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRateLimiter")
            .field("gate", &self.gate())
            .field("executor", &self.executor)
            .finish()
    }
}
