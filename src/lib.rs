//! # doorwatch - presence detection over a serial sensor stream
//!
//! A light/distance sensor prints readings such as `li812di27` into a serial
//! line, interleaved with whatever else the firmware feels like printing.
//! doorwatch turns that stream into presence events: it buffers the text,
//! extracts readings, debounces them into an absent/present state, and on
//! every arrival raises an alert and writes a rate-limited log entry.
//!
//! ## Core Concepts
//!
//! - **StreamBuffer**: bounded working buffer for raw fragments
//! - **ReadingExtractor**: finds complete `li<digits>di<digits>` tags
//! - **PresenceTracker**: two-state machine with a distance threshold
//! - **AlertDispatcher / LogRateLimiter**: side effects on arrival
//! - **PresenceMonitor**: the single-owner core wiring it all together
//! - **MonitorRuntime**: a worker thread owning the core, with a poll tick
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use doorwatch::effects::EffectExecutor;
//! use doorwatch::sinks::{InMemoryRecordStore, InMemoryRemoteLog, RecordingAlertSink};
//! use doorwatch::time::SystemClock;
//! use doorwatch::{MonitorConfig, MonitorSinks, PresenceMonitor, PresenceState};
//!
//! let sinks = MonitorSinks::new(
//!     Arc::new(RecordingAlertSink::new()),
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(InMemoryRemoteLog::new()),
//! );
//! let mut monitor = PresenceMonitor::new(
//!     &MonitorConfig::default(),
//!     sinks,
//!     EffectExecutor::inline(),
//!     Arc::new(SystemClock),
//! );
//!
//! monitor.on_opened();
//! monitor.on_fragment("boot ok\r\nli10");
//! monitor.on_fragment("23di0");
//! monitor.on_fragment("07");
//! let report = monitor.on_tick();
//!
//! assert_eq!(report.readings.len(), 1);
//! assert_eq!(monitor.state(), PresenceState::Present);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert;
pub mod config;
pub mod effects;
pub mod error;
pub mod monitor;
pub mod presence;
pub mod rate_limit;
pub mod reading;
pub mod sinks;
pub mod status;
pub mod stream;
pub mod time;

// Re-export primary types at crate root for convenience
pub use alert::AlertDispatcher;
pub use config::MonitorConfig;
pub use effects::EffectExecutor;
pub use error::{DoorwatchError, DoorwatchResult, ExecutionError, ExtractError, SinkError, ValidationError};
pub use monitor::{MonitorHandle, MonitorRuntime, MonitorSinks, Poller, PresenceMonitor, ScanReport};
pub use presence::{PresenceState, PresenceTracker, StateChanged};
pub use rate_limit::{LogAttempt, LogGate, LogRateLimiter};
pub use reading::Reading;
pub use status::{MonitorStatus, StatusBoard, StatusStream};
pub use stream::{Extracted, ReadingExtractor, StreamBuffer};
