//! Presence detection state machine.
//!
//! The tracker debounces readings into two states. Only a change of state
//! produces an event; a run of close (or far) readings produces exactly one.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Whether someone is within range of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// Nobody within the threshold.
    #[default]
    Absent,
    /// Someone within the threshold.
    Present,
}

impl PresenceState {
    /// Returns true for `Present`.
    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

/// Emitted when the tracker changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    /// State before the reading.
    pub from: PresenceState,
    /// State after the reading.
    pub to: PresenceState,
    /// The reading that caused the change.
    pub reading: Reading,
}

impl StateChanged {
    /// Returns true if this is an absent-to-present transition.
    #[must_use]
    pub const fn entered_present(&self) -> bool {
        self.to.is_present()
    }
}

/// Two-state presence machine over distance readings.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    threshold: u64,
    state: PresenceState,
}

impl PresenceTracker {
    /// Creates a tracker in `Absent`. A reading is "close" when its distance is
    /// strictly below `threshold`.
    #[must_use]
    pub const fn new(threshold: u64) -> Self {
        Self {
            threshold,
            state: PresenceState::Absent,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PresenceState {
        self.state
    }

    /// Distance threshold in centimetres.
    #[must_use]
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Feeds one reading. Returns an event only if the state changed.
    pub fn update(&mut self, reading: Reading) -> Option<StateChanged> {
        let next = if reading.distance < self.threshold {
            PresenceState::Present
        } else {
            PresenceState::Absent
        };

        if next == self.state {
            return None;
        }

        let from = std::mem::replace(&mut self.state, next);
        Some(StateChanged { from, to: next, reading })
    }

    /// Unconditionally returns to `Absent` without emitting an event.
    pub fn force_absent(&mut self) {
        self.state = PresenceState::Absent;
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(35)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(distance: u64) -> Reading {
        Reading::new(500, distance)
    }

    #[test]
    fn starts_absent() {
        let tracker = PresenceTracker::default();
        assert_eq!(tracker.state(), PresenceState::Absent);
        assert_eq!(tracker.threshold(), 35);
    }

    #[test]
    fn debounces_steady_readings() {
        let mut tracker = PresenceTracker::new(35);
        let events: Vec<(usize, StateChanged)> = [50, 20, 10, 40, 5]
            .into_iter()
            .enumerate()
            .filter_map(|(idx, d)| tracker.update(at(d)).map(|e| (idx, e)))
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 1);
        assert_eq!(events[0].1.to, PresenceState::Present);
        assert_eq!(events[1].0, 3);
        assert_eq!(events[1].1.to, PresenceState::Absent);
        assert_eq!(events[2].0, 4);
        assert!(events[2].1.entered_present());
        assert_eq!(events[2].1.reading.distance, 5);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut tracker = PresenceTracker::new(35);
        assert!(tracker.update(at(35)).is_none());
        let event = tracker.update(at(34)).unwrap();
        assert_eq!(event.from, PresenceState::Absent);
        assert_eq!(event.to, PresenceState::Present);
    }

    #[test]
    fn force_absent_is_silent() {
        let mut tracker = PresenceTracker::new(35);
        tracker.update(at(10)).unwrap();
        tracker.force_absent();
        assert_eq!(tracker.state(), PresenceState::Absent);

        // The next close reading is a fresh transition.
        assert!(tracker.update(at(10)).unwrap().entered_present());
    }
}
