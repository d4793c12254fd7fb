//! Presence monitor: the single-owner core and its threaded runtime.
//!
//! [`PresenceMonitor`] is synchronous and deterministic; [`MonitorRuntime`]
//! puts one on a worker thread fed by channels and a [`Poller`].

/// Single-owner core.
pub mod engine;
/// Poll tick source.
pub mod poller;
/// Worker thread and handles.
pub mod runtime;

pub use engine::{MonitorSinks, PresenceMonitor, ScanReport};
pub use poller::Poller;
pub use runtime::{MonitorHandle, MonitorRuntime};
