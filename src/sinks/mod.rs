//! Side-effect capabilities and their implementations.
//!
//! The traits in [`traits`] are what the core depends on; the remaining
//! modules are concrete backends.

/// Terminal and no-op sinks.
pub mod console;
/// Remote log over HTTP.
#[cfg(feature = "remote-http")]
pub mod http;
/// JSON-lines file record store.
pub mod jsonl;
/// In-memory sinks.
pub mod memory;
/// Capability traits and record shapes.
pub mod traits;

pub use console::{SilentAlertSink, TerminalAlertSink, UnconfiguredRemoteLog};
#[cfg(feature = "remote-http")]
pub use http::HttpRemoteLog;
pub use jsonl::JsonlRecordStore;
pub use memory::{InMemoryRecordStore, InMemoryRemoteLog, RecordingAlertSink};
pub use traits::{AlertSink, LogRecord, Notification, RecordStore, RemoteLog, RemoteLogEntry};
