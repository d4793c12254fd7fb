//! Monitor configuration.
//!
//! Defaults mirror the sensor firmware's expectations: a 100-character working
//! buffer, a 35 cm presence threshold, one accepted log every 5 seconds and a
//! 100 ms poll tick.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Largest accepted `max_buffer_size`, in characters.
pub const MAX_BUFFER_SIZE: usize = 1 << 20;

/// Configuration for the presence monitor and its runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum number of characters retained in the working buffer.
    pub max_buffer_size: usize,
    /// Readings strictly closer than this many centimetres mean "present".
    pub presence_threshold: u64,
    /// Minimum time between accepted log emissions.
    pub min_log_interval_ms: u64,
    /// Poll tick interval while the connection is open.
    pub poll_interval_ms: u64,
    /// Text appended to the buffer on each poll tick. May be empty.
    pub tick_filler: String,
    /// Max queued fragments before the transport starts losing data.
    pub fragment_queue_capacity: usize,
    /// Per-subscriber status stream capacity.
    pub status_stream_capacity: usize,
    /// Number of side-effect workers.
    pub effect_workers: usize,
    /// Max queued side effects.
    pub effect_queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 100,
            presence_threshold: 35,
            min_log_interval_ms: 5_000,
            poll_interval_ms: 100,
            tick_filler: ".".to_string(),
            fragment_queue_capacity: 1024,
            status_stream_capacity: 256,
            effect_workers: 2,
            effect_queue_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Minimum log interval as a `chrono` duration.
    #[must_use]
    pub fn min_log_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.min_log_interval_ms).unwrap_or(i64::MAX))
    }

    /// Poll tick interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks the configuration for values the monitor cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_buffer_size < 2 {
            return Err(invalid("max_buffer_size", "must be at least 2"));
        }
        if self.max_buffer_size > MAX_BUFFER_SIZE {
            return Err(invalid("max_buffer_size", "must not exceed 1048576"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        if self.tick_filler.chars().count() > self.max_buffer_size / 2 {
            return Err(invalid("tick_filler", "must fit in half of the buffer"));
        }
        // Letters could complete a tag marker, digits could extend a digit run.
        if self.tick_filler.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("tick_filler", "must not contain letters or digits"));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed JSON or a validation error.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::ConfigParse {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfigRead` if the file cannot be read.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = MonitorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.max_buffer_size, 100);
        assert_eq!(cfg.presence_threshold, 35);
        assert_eq!(cfg.min_log_interval(), chrono::Duration::seconds(5));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = MonitorConfig::from_json_str(r#"{"presence_threshold": 50}"#).unwrap();
        assert_eq!(cfg.presence_threshold, 50);
        assert_eq!(cfg.max_buffer_size, 100);
        assert_eq!(cfg.tick_filler, ".");
    }

    #[test]
    fn test_rejects_tiny_buffer() {
        let err = MonitorConfig::from_json_str(r#"{"max_buffer_size": 1}"#).unwrap_err();
        let ValidationError::InvalidConfig { field, .. } = err else {
            panic!("expected InvalidConfig, got {err:?}");
        };
        assert_eq!(field, "max_buffer_size");
    }

    #[test]
    fn test_rejects_oversized_buffer() {
        let err = MonitorConfig::from_json_str(r#"{"max_buffer_size": 18446744073709551615}"#).unwrap_err();
        let ValidationError::InvalidConfig { field, .. } = err else {
            panic!("expected InvalidConfig, got {err:?}");
        };
        assert_eq!(field, "max_buffer_size");

        let at_limit = MonitorConfig {
            max_buffer_size: MAX_BUFFER_SIZE,
            ..MonitorConfig::default()
        };
        at_limit.validate().unwrap();
    }

    #[test]
    fn test_serialized_fields() {
        let json = serde_json::to_value(MonitorConfig::default()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&"fragment_queue_capacity"));
        assert!(!keys.contains(&"control_queue_capacity"));
    }

    #[test]
    fn test_rejects_alphanumeric_filler() {
        for filler in ["0", "l", "di"] {
            let cfg = MonitorConfig {
                tick_filler: filler.to_string(),
                ..MonitorConfig::default()
            };
            assert!(cfg.validate().is_err(), "filler {filler:?} accepted");
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = MonitorConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ValidationError::ConfigParse { .. }));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doorwatch.json");
        std::fs::write(&path, r#"{"poll_interval_ms": 250, "tick_filler": ""}"#).unwrap();

        let cfg = MonitorConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert!(cfg.tick_filler.is_empty());

        let missing = MonitorConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ValidationError::ConfigRead { .. }));
    }
}
