//! Capability traits for side effects.
//!
//! The core never plays sounds, posts notifications or talks to a database
//! itself. It calls these traits, and every failure comes back as a
//! [`SinkError`] that the caller logs and drops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SinkError;
use crate::reading::Reading;
use crate::time::iso_timestamp;

/// A user-facing proximity notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique request identifier.
    pub id: Uuid,
    /// Headline.
    pub title: String,
    /// Body text including the reading.
    pub body: String,
    /// Distance in centimetres.
    pub distance: u64,
    /// Light intensity.
    pub light: u64,
}

impl Notification {
    /// Builds the proximity notification for a reading.
    #[must_use]
    pub fn for_reading(reading: Reading) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: "Person Detected!".to_string(),
            body: format!(
                "Someone is within proximity (Distance: {}cm, Light: {})",
                reading.distance, reading.light
            ),
            distance: reading.distance,
            light: reading.light,
        }
    }
}

/// Durable log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Distance in centimetres.
    pub distance: u64,
    /// Light intensity.
    pub light_intensity: u64,
    /// When the log attempt was made.
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Builds a record for a reading observed at `at`.
    #[must_use]
    pub const fn new(reading: Reading, at: DateTime<Utc>) -> Self {
        Self {
            distance: reading.distance,
            light_intensity: reading.light,
            timestamp: at,
        }
    }
}

/// Body sent to the remote append endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLogEntry {
    /// Distance in centimetres.
    pub distance: u64,
    /// Light intensity.
    pub light_intensity: u64,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

impl RemoteLogEntry {
    /// Builds an entry for a reading observed at `at`.
    #[must_use]
    pub fn new(reading: Reading, at: DateTime<Utc>) -> Self {
        Self {
            distance: reading.distance,
            light_intensity: reading.light,
            timestamp: iso_timestamp(at),
        }
    }
}

/// Sound and notification output.
pub trait AlertSink: Send + Sync {
    /// Plays the alert sound.
    fn play_alert_sound(&self) -> Result<(), SinkError>;

    /// Posts a local notification.
    fn post_notification(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Durable structured-record store.
pub trait RecordStore: Send + Sync {
    /// Appends one record.
    fn append_record(&self, record: &LogRecord) -> Result<(), SinkError>;
}

/// Remote spreadsheet-style append endpoint.
///
/// `Ok(())` means the endpoint confirmed the append; only then does the log
/// gate advance.
pub trait RemoteLog: Send + Sync {
    /// Appends one entry.
    fn append_remote(&self, entry: &RemoteLogEntry) -> Result<(), SinkError>;
}
