//! Alert dispatch on presence.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::effects::EffectExecutor;
use crate::reading::Reading;
use crate::sinks::{AlertSink, Notification};

/// Plays the alert sound and posts a notification for each presence transition.
///
/// Both actions are fire-and-forget. A failure in one does not prevent the
/// other and never reaches the caller.
#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    executor: EffectExecutor,
}

impl AlertDispatcher {
    /// Creates a dispatcher over `sink`.
    pub fn new(sink: Arc<dyn AlertSink>, executor: EffectExecutor) -> Self {
        Self { sink, executor }
    }

    /// Fires the alert for `reading`.
    pub fn fire(&self, reading: Reading) {
        let sink = Arc::clone(&self.sink);
        let notification = Notification::for_reading(reading);
        self.executor.submit("alert", move || {
            if let Err(err) = sink.play_alert_sound() {
                warn!(error = %err, "alert sound failed");
            }
            match sink.post_notification(&notification) {
                Ok(()) => debug!(id = %notification.id, "notification posted"),
                Err(err) => warn!(error = %err, "notification failed"),
            }
        });
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher").field("executor", &self.executor).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::RecordingAlertSink;

    #[test]
    fn fire_plays_sound_and_notifies() {
        let sink = Arc::new(RecordingAlertSink::new());
        let alerts = AlertDispatcher::new(sink.clone(), EffectExecutor::inline());

        alerts.fire(Reading::new(640, 18));

        assert_eq!(sink.sounds_played(), 1);
        let notes = sink.notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].body.contains("Distance: 18cm"));
        assert!(notes[0].body.contains("Light: 640"));
    }

    #[test]
    fn denied_notification_still_plays_sound() {
        let sink = Arc::new(RecordingAlertSink::denying_notifications());
        let alerts = AlertDispatcher::new(sink.clone(), EffectExecutor::inline());

        alerts.fire(Reading::new(1, 2));

        assert_eq!(sink.sounds_played(), 1);
        assert!(sink.notifications().is_empty());
    }
}
