//! Sinks for running without audio, notification or remote services.

use std::io::Write;

use tracing::{info, warn};

use crate::error::SinkError;

use super::traits::{AlertSink, Notification, RemoteLog, RemoteLogEntry};

/// Rings the terminal bell and logs notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalAlertSink;

impl AlertSink for TerminalAlertSink {
    fn play_alert_sound(&self) -> Result<(), SinkError> {
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| SinkError::Alert { message: e.to_string() })
    }

    fn post_notification(&self, notification: &Notification) -> Result<(), SinkError> {
        info!(
            id = %notification.id,
            distance = notification.distance,
            light = notification.light,
            "{}: {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// Remote log used when no endpoint is configured.
///
/// Every call fails, so the log gate never advances and every presence
/// transition is written to the durable store.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredRemoteLog;

impl RemoteLog for UnconfiguredRemoteLog {
    fn append_remote(&self, _entry: &RemoteLogEntry) -> Result<(), SinkError> {
        Err(SinkError::NotConfigured)
    }
}

/// Logs through `tracing` instead of making any noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlertSink;

impl AlertSink for SilentAlertSink {
    fn play_alert_sound(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn post_notification(&self, notification: &Notification) -> Result<(), SinkError> {
        warn!(distance = notification.distance, light = notification.light, "{}", notification.body);
        Ok(())
    }
}
