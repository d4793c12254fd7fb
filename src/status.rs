//! Observable monitor status.
//!
//! A UI (or any other observer) reads the latest [`MonitorStatus`] snapshot or
//! subscribes to a [`StatusStream`] that receives a snapshot on every change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::error::{DoorwatchError, DoorwatchResult, ExecutionError};

/// Snapshot of everything a display needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    /// Light intensity from the latest reading.
    pub light_intensity: u64,
    /// Distance from the latest reading.
    pub distance: u64,
    /// Whether the transport is open.
    pub is_connected: bool,
    /// Whether the presence tracker is in `Present`.
    pub detected_person: bool,
    /// `"Last logged at: HH:MM:SS"`, or empty before the first durable log.
    pub last_log_time: String,
}

struct BoardInner {
    status: MonitorStatus,
    subscribers: Vec<Sender<MonitorStatus>>,
}

/// Holds the current status and fans changes out to subscribers.
pub struct StatusBoard {
    inner: Mutex<BoardInner>,
    stream_capacity: usize,
    dropped_events: AtomicU64,
}

impl StatusBoard {
    /// Creates a board with per-subscriber buffers of `stream_capacity` snapshots.
    #[must_use]
    pub fn new(stream_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BoardInner {
                status: MonitorStatus::default(),
                subscribers: Vec::new(),
            }),
            stream_capacity: stream_capacity.max(1),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MonitorStatus {
        match self.inner.lock() {
            Ok(guard) => guard.status.clone(),
            Err(poisoned) => poisoned.into_inner().status.clone(),
        }
    }

    /// Applies `change` and notifies subscribers if anything differs.
    pub fn update(&self, change: impl FnOnce(&mut MonitorStatus)) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let before = guard.status.clone();
        change(&mut guard.status);
        if guard.status == before {
            return;
        }

        let snapshot = guard.status.clone();
        let mut dropped = 0u64;
        // Never block the publisher: slow subscribers lose snapshots, closed ones are removed.
        guard.subscribers.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        if dropped > 0 {
            self.dropped_events.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    /// Registers a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> StatusStream {
        let (tx, rx) = bounded::<MonitorStatus>(self.stream_capacity);
        if let Ok(mut guard) = self.inner.lock() {
            guard.subscribers.push(tx);
        }
        StatusStream { rx }
    }

    /// Snapshots not delivered because a subscriber was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("status", &self.snapshot())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

/// A subscription to status changes.
///
/// Dropping the stream unsubscribes on the next publish.
#[derive(Debug)]
pub struct StatusStream {
    rx: Receiver<MonitorStatus>,
}

impl StatusStream {
    /// Receive the next snapshot (blocking).
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` once the board is gone and the
    /// queue is empty.
    pub fn recv(&self) -> DoorwatchResult<MonitorStatus> {
        self.rx.recv().map_err(|_| {
            DoorwatchError::Execution(ExecutionError::Disconnected {
                path: "status_stream".to_string(),
            })
        })
    }

    /// Receive the next snapshot with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Timeout` if nothing arrives in time, or
    /// `ExecutionError::Disconnected` once the board is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> DoorwatchResult<MonitorStatus> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => DoorwatchError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => DoorwatchError::Execution(ExecutionError::Disconnected {
                path: "status_stream".to_string(),
            }),
        })
    }

    /// Snapshots already queued, without blocking.
    pub fn drain(&self) -> Vec<MonitorStatus> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_publishes_changes_only() {
        let board = StatusBoard::new(8);
        let stream = board.subscribe();

        board.update(|s| s.distance = 40);
        board.update(|s| s.distance = 40);
        board.update(|s| s.is_connected = true);

        let got = stream.drain();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].distance, 40);
        assert!(!got[0].is_connected);
        assert!(got[1].is_connected);
        assert_eq!(board.snapshot(), got[1]);
    }

    #[test]
    fn full_subscriber_counts_drops() {
        let board = StatusBoard::new(1);
        let stream = board.subscribe();

        board.update(|s| s.distance = 1);
        board.update(|s| s.distance = 2);

        assert_eq!(board.dropped_events(), 1);
        assert_eq!(stream.recv().unwrap().distance, 1);
    }

    #[test]
    fn dropped_stream_is_pruned() {
        let board = StatusBoard::new(4);
        drop(board.subscribe());
        board.update(|s| s.light_intensity = 9);
        assert_eq!(board.dropped_events(), 0);
    }

    #[test]
    fn recv_timeout_reports_timeout() {
        let board = StatusBoard::new(4);
        let stream = board.subscribe();
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, DoorwatchError::Execution(ExecutionError::Timeout { .. })));
    }

    #[test]
    fn stream_outliving_board_reports_disconnect() {
        let board = StatusBoard::new(4);
        let stream = board.subscribe();
        board.update(|s| s.distance = 3);
        drop(board);

        assert_eq!(stream.recv().unwrap().distance, 3);
        let err = stream.recv().unwrap_err();
        assert!(matches!(err, DoorwatchError::Execution(ExecutionError::Disconnected { .. })));
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, DoorwatchError::Execution(ExecutionError::Disconnected { .. })));
    }
}
