use std::sync::Arc;

use tracing::{debug, info};

use crate::alert::AlertDispatcher;
use crate::config::MonitorConfig;
use crate::effects::EffectExecutor;
use crate::presence::{PresenceState, PresenceTracker, StateChanged};
use crate::rate_limit::{LogAttempt, LogGate, LogRateLimiter};
use crate::reading::Reading;
use crate::sinks::{AlertSink, RecordStore, RemoteLog};
use crate::status::{MonitorStatus, StatusBoard, StatusStream};
use crate::stream::{Extracted, ReadingExtractor, StreamBuffer};
use crate::time::Clock;

/// The capabilities a monitor calls into.
#[derive(Clone)]
pub struct MonitorSinks {
    /// Sound and notification output.
    pub alert: Arc<dyn AlertSink>,
    /// Durable record store.
    pub store: Arc<dyn RecordStore>,
    /// Remote append endpoint.
    pub remote: Arc<dyn RemoteLog>,
}

impl MonitorSinks {
    /// Bundles the three capabilities.
    pub fn new(alert: Arc<dyn AlertSink>, store: Arc<dyn RecordStore>, remote: Arc<dyn RemoteLog>) -> Self {
        Self { alert, store, remote }
    }
}

/// What one call into the monitor produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Readings extracted, in stream order.
    pub readings: Vec<Reading>,
    /// Presence transitions, in order.
    pub transitions: Vec<StateChanged>,
    /// Number of alerts fired.
    pub alerts_fired: usize,
    /// Outcome of each log attempt.
    pub log_attempts: Vec<LogAttempt>,
    /// Tags dropped because their digits could not be parsed.
    pub discarded: usize,
}

impl ScanReport {
    fn merge(&mut self, other: Self) {
        self.readings.extend(other.readings);
        self.transitions.extend(other.transitions);
        self.alerts_fired += other.alerts_fired;
        self.log_attempts.extend(other.log_attempts);
        self.discarded += other.discarded;
    }
}

/// Single-owner presence detection core.
///
/// All buffer and state mutations go through `&mut self`, so whoever owns the
/// monitor is the serialization point. [`crate::monitor::MonitorRuntime`] owns
/// one on a dedicated thread; tests drive one directly.
pub struct PresenceMonitor {
    buffer: StreamBuffer,
    extractor: ReadingExtractor,
    tracker: PresenceTracker,
    alerts: AlertDispatcher,
    limiter: LogRateLimiter,
    status: Arc<StatusBoard>,
    clock: Arc<dyn Clock>,
    tick_filler: String,
}

impl PresenceMonitor {
    /// Creates a monitor in `Absent`, disconnected, with an empty buffer.
    pub fn new(cfg: &MonitorConfig, sinks: MonitorSinks, executor: EffectExecutor, clock: Arc<dyn Clock>) -> Self {
        let status = Arc::new(StatusBoard::new(cfg.status_stream_capacity));
        let alerts = AlertDispatcher::new(sinks.alert, executor.clone());
        let limiter = LogRateLimiter::new(
            cfg.min_log_interval(),
            sinks.store,
            sinks.remote,
            Arc::clone(&status),
            executor,
        );
        Self {
            buffer: StreamBuffer::new(cfg.max_buffer_size),
            extractor: ReadingExtractor::new(),
            tracker: PresenceTracker::new(cfg.presence_threshold),
            alerts,
            limiter,
            status,
            clock,
            tick_filler: cfg.tick_filler.clone(),
        }
    }

    /// Feeds a text fragment from the transport.
    pub fn on_fragment(&mut self, text: &str) -> ScanReport {
        self.buffer.append(text);
        self.scan()
    }

    /// Feeds raw bytes. Fragments that are not valid UTF-8 are dropped whole.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> ScanReport {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.on_fragment(text),
            Err(err) => {
                debug!(len = bytes.len(), error = %err, "dropping undecodable fragment");
                ScanReport::default()
            }
        }
    }

    /// Poll tick: appends the filler and rescans.
    pub fn on_tick(&mut self) -> ScanReport {
        if !self.tick_filler.is_empty() {
            self.buffer.append(&self.tick_filler);
        }
        self.scan()
    }

    /// The transport opened. Starts a fresh buffer.
    pub fn on_opened(&mut self) {
        self.buffer.clear();
        self.status.update(|s| s.is_connected = true);
        info!("sensor connected");
    }

    /// The transport closed. Presence state is kept.
    pub fn on_closed(&mut self) {
        self.buffer.clear();
        self.status.update(|s| s.is_connected = false);
        info!("sensor disconnected");
    }

    /// The device disappeared. Forces `Absent` silently and drops any partial input.
    pub fn on_device_removed(&mut self) {
        self.buffer.clear();
        self.tracker.force_absent();
        self.status.update(|s| {
            s.is_connected = false;
            s.detected_person = false;
        });
        info!("sensor removed");
    }

    /// Reopens the log gate.
    pub fn reset_log_gate(&mut self) {
        self.limiter.reset();
    }

    /// Current presence state.
    #[must_use]
    pub const fn state(&self) -> PresenceState {
        self.tracker.state()
    }

    /// Working buffer.
    #[must_use]
    pub const fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Copy of the log gate.
    #[must_use]
    pub fn log_gate(&self) -> LogGate {
        self.limiter.gate()
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> MonitorStatus {
        self.status.snapshot()
    }

    /// Subscribes to status changes.
    #[must_use]
    pub fn subscribe(&self) -> StatusStream {
        self.status.subscribe()
    }

    /// Shared status board.
    #[must_use]
    pub fn status_board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        for found in self.extractor.drain(&mut self.buffer) {
            match found {
                Extracted::Reading { reading, .. } => report.merge(self.handle_reading(reading)),
                Extracted::Discarded { error, .. } => {
                    debug!(%error, "discarding unparseable tag");
                    report.discarded += 1;
                }
            }
        }
        report
    }

    fn handle_reading(&mut self, reading: Reading) -> ScanReport {
        let mut report = ScanReport {
            readings: vec![reading],
            ..ScanReport::default()
        };

        let changed = self.tracker.update(reading);
        let present = self.tracker.state().is_present();
        self.status.update(|s| {
            s.light_intensity = reading.light;
            s.distance = reading.distance;
            s.detected_person = present;
        });

        let Some(event) = changed else {
            return report;
        };
        report.transitions.push(event);

        if event.entered_present() {
            info!(%reading, "person detected");
            self.alerts.fire(reading);
            report.alerts_fired += 1;
            report.log_attempts.push(self.limiter.attempt_log(reading, self.clock.now()));
        } else {
            info!(%reading, "presence cleared");
        }
        report
    }
}

impl std::fmt::Debug for PresenceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceMonitor")
            .field("buffer", &self.buffer)
            .field("tracker", &self.tracker)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{InMemoryRecordStore, InMemoryRemoteLog, RecordingAlertSink};
    use crate::time::ManualClock;

    fn monitor() -> (PresenceMonitor, Arc<RecordingAlertSink>) {
        let alert = Arc::new(RecordingAlertSink::new());
        let sinks = MonitorSinks::new(
            alert.clone(),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRemoteLog::new()),
        );
        let m = PresenceMonitor::new(
            &MonitorConfig::default(),
            sinks,
            EffectExecutor::inline(),
            Arc::new(ManualClock::default()),
        );
        (m, alert)
    }

    #[test]
    fn tick_flushes_trailing_digits() {
        let (mut m, _) = monitor();
        assert!(m.on_fragment("li10di20").readings.is_empty());
        let report = m.on_tick();
        assert_eq!(report.readings, vec![Reading::new(10, 20)]);
        assert_eq!(m.buffer().as_str(), ".");
    }

    #[test]
    fn empty_filler_only_rescans() {
        let cfg = MonitorConfig {
            tick_filler: String::new(),
            ..MonitorConfig::default()
        };
        let sinks = MonitorSinks::new(
            Arc::new(RecordingAlertSink::new()),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRemoteLog::new()),
        );
        let mut m = PresenceMonitor::new(&cfg, sinks, EffectExecutor::inline(), Arc::new(ManualClock::default()));
        m.on_fragment("li10di20");
        assert!(m.on_tick().readings.is_empty());
        assert_eq!(m.buffer().as_str(), "li10di20");
    }

    #[test]
    fn status_tracks_latest_reading() {
        let (mut m, _) = monitor();
        m.on_opened();
        m.on_fragment("li300di80\nli310di12\n");
        let status = m.status();
        assert!(status.is_connected);
        assert!(status.detected_person);
        assert_eq!(status.light_intensity, 310);
        assert_eq!(status.distance, 12);
    }

    #[test]
    fn invalid_utf8_fragment_is_dropped() {
        let (mut m, _) = monitor();
        m.on_fragment("li1");
        let report = m.on_bytes(&[0xff, 0xfe, b'd']);
        assert_eq!(report, ScanReport::default());
        assert_eq!(m.buffer().as_str(), "li1");
    }

    #[test]
    fn close_clears_buffer_but_keeps_presence() {
        let (mut m, alert) = monitor();
        m.on_fragment("li5di5\nli7di");
        assert_eq!(m.state(), PresenceState::Present);
        m.on_closed();
        assert!(m.buffer().is_empty());
        assert_eq!(m.state(), PresenceState::Present);

        // Still present after reconnect, so no second alert.
        m.on_opened();
        m.on_fragment("li5di6\n");
        assert_eq!(alert.sounds_played(), 1);
    }

    #[test]
    fn discarded_tags_are_counted() {
        let (mut m, _) = monitor();
        let report = m.on_fragment(&format!("li1di{}\n", "9".repeat(25)));
        assert_eq!(report.discarded, 1);
        assert!(report.readings.is_empty());
    }
}
