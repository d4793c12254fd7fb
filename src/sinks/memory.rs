//! In-memory sinks.
//!
//! Thread-safe implementations of the capability traits that simply record
//! what they were asked to do. Intended for embedding, tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::SinkError;

use super::traits::{AlertSink, LogRecord, Notification, RecordStore, RemoteLog, RemoteLogEntry};

fn lock_err(context: &'static str) -> SinkError {
    SinkError::Store {
        message: format!("poisoned lock: {context}"),
    }
}

/// Record store that keeps every record in a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<LogRecord>>,
    fail_with: Mutex<Option<SinkError>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `err` (or succeed again with `None`).
    pub fn fail_with(&self, err: Option<SinkError>) {
        if let Ok(mut guard) = self.fail_with.lock() {
            *guard = err;
        }
    }

    /// Snapshot of stored records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn append_record(&self, record: &LogRecord) -> Result<(), SinkError> {
        if let Some(err) = self.fail_with.lock().map_err(|_| lock_err("fail_with"))?.clone() {
            return Err(err);
        }
        self.records
            .lock()
            .map_err(|_| lock_err("records"))?
            .push(record.clone());
        Ok(())
    }
}

/// Remote log that records every attempt and replies from a script.
///
/// Scripted outcomes are consumed in order; once exhausted every call succeeds.
#[derive(Debug, Default)]
pub struct InMemoryRemoteLog {
    attempts: Mutex<Vec<RemoteLogEntry>>,
    script: Mutex<VecDeque<Result<(), SinkError>>>,
}

impl InMemoryRemoteLog {
    /// Creates a remote log that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of a future call.
    pub fn push_outcome(&self, outcome: Result<(), SinkError>) {
        if let Ok(mut guard) = self.script.lock() {
            guard.push_back(outcome);
        }
    }

    /// Every entry the log was asked to append, successful or not.
    #[must_use]
    pub fn attempts(&self) -> Vec<RemoteLogEntry> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl RemoteLog for InMemoryRemoteLog {
    fn append_remote(&self, entry: &RemoteLogEntry) -> Result<(), SinkError> {
        self.attempts
            .lock()
            .map_err(|_| lock_err("attempts"))?
            .push(entry.clone());
        self.script
            .lock()
            .map_err(|_| lock_err("script"))?
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Alert sink that counts sounds and keeps notifications.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    sounds: Mutex<usize>,
    notifications: Mutex<Vec<Notification>>,
    deny_notifications: bool,
}

impl RecordingAlertSink {
    /// Creates a sink where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects notifications, like a denied permission.
    #[must_use]
    pub fn denying_notifications() -> Self {
        Self {
            deny_notifications: true,
            ..Self::default()
        }
    }

    /// Number of times the alert sound played.
    #[must_use]
    pub fn sounds_played(&self) -> usize {
        self.sounds.lock().map(|n| *n).unwrap_or_default()
    }

    /// Notifications accepted so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl AlertSink for RecordingAlertSink {
    fn play_alert_sound(&self) -> Result<(), SinkError> {
        let mut sounds = self.sounds.lock().map_err(|_| SinkError::Alert {
            message: "poisoned lock: sounds".to_string(),
        })?;
        *sounds += 1;
        Ok(())
    }

    fn post_notification(&self, notification: &Notification) -> Result<(), SinkError> {
        if self.deny_notifications {
            return Err(SinkError::Notification {
                message: "notification permission denied".to_string(),
            });
        }
        self.notifications
            .lock()
            .map_err(|_| SinkError::Notification {
                message: "poisoned lock: notifications".to_string(),
            })?
            .push(notification.clone());
        Ok(())
    }
}
