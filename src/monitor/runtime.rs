//! Threaded runtime for the presence monitor.
//!
//! One worker thread owns the [`PresenceMonitor`]. Transport fragments and
//! lifecycle signals arrive on a single ordered inbox; poll ticks arrive on the
//! [`Poller`]'s channel. Both are multiplexed with `select!`, so the buffer and
//! presence state only ever have one writer. Side effects run on a separate
//! [`EffectExecutor`] pool and never hold up the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::effects::EffectExecutor;
use crate::error::{DoorwatchError, DoorwatchResult, ExecutionError};
use crate::status::{MonitorStatus, StatusBoard, StatusStream};
use crate::time::Clock;

use super::engine::{MonitorSinks, PresenceMonitor};
use super::poller::Poller;

#[derive(Debug)]
enum Input {
    Text(String),
    Bytes(Vec<u8>),
    Opened,
    Closed,
    DeviceRemoved,
    ResetLogGate,
    Flush { reply: Sender<()> },
    Shutdown,
}

fn disconnected() -> DoorwatchError {
    DoorwatchError::Execution(ExecutionError::Disconnected {
        path: "monitor_inbox".to_string(),
    })
}

/// Cloneable sender into a running monitor.
///
/// Hand one to the transport callback and keep another for lifecycle signals.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    inbox: Sender<Input>,
    capacity: usize,
    dropped_fragments: Arc<AtomicU64>,
}

impl MonitorHandle {
    /// Queues a text fragment without blocking.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::QueueFull` (the fragment is lost and counted)
    /// or `ExecutionError::Disconnected` after shutdown.
    pub fn feed(&self, text: &str) -> DoorwatchResult<()> {
        self.try_push(Input::Text(text.to_string()))
    }

    /// Queues a raw byte fragment without blocking. Decoding happens on the worker.
    ///
    /// # Errors
    ///
    /// Same as [`MonitorHandle::feed`].
    pub fn feed_bytes(&self, bytes: &[u8]) -> DoorwatchResult<()> {
        self.try_push(Input::Bytes(bytes.to_vec()))
    }

    /// Signals that the transport opened; starts polling.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` after shutdown.
    pub fn opened(&self) -> DoorwatchResult<()> {
        self.push(Input::Opened)
    }

    /// Signals that the transport closed; stops polling.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` after shutdown.
    pub fn closed(&self) -> DoorwatchResult<()> {
        self.push(Input::Closed)
    }

    /// Signals that the device was removed; stops polling and resets presence.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` after shutdown.
    pub fn device_removed(&self) -> DoorwatchResult<()> {
        self.push(Input::DeviceRemoved)
    }

    /// Reopens the log gate.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` after shutdown.
    pub fn reset_log_gate(&self) -> DoorwatchResult<()> {
        self.push(Input::ResetLogGate)
    }

    /// Waits until everything queued before this call has been processed.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Timeout` if the worker does not catch up in time.
    pub fn flush(&self, timeout: Duration) -> DoorwatchResult<()> {
        let (reply, done) = bounded::<()>(1);
        self.push(Input::Flush { reply })?;
        done.recv_timeout(timeout).map_err(|err| match err {
            crossbeam_channel::RecvTimeoutError::Timeout => DoorwatchError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            crossbeam_channel::RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Fragments lost to a full inbox.
    #[must_use]
    pub fn dropped_fragments(&self) -> u64 {
        self.dropped_fragments.load(Ordering::Relaxed)
    }

    fn try_push(&self, input: Input) -> DoorwatchResult<()> {
        match self.inbox.try_send(input) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped_fragments.fetch_add(1, Ordering::Relaxed);
                Err(DoorwatchError::Execution(ExecutionError::QueueFull {
                    path: "monitor_inbox".to_string(),
                    capacity: self.capacity,
                }))
            }
            Err(TrySendError::Disconnected(_)) => Err(disconnected()),
        }
    }

    fn push(&self, input: Input) -> DoorwatchResult<()> {
        self.inbox.send(input).map_err(|_| disconnected())
    }
}

/// Owns the monitor worker thread.
///
/// Dropping the runtime stops the worker and waits for it. Side effects already
/// handed to the effect pool finish on their own.
pub struct MonitorRuntime {
    handle: MonitorHandle,
    status: Arc<StatusBoard>,
    executor: EffectExecutor,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorRuntime {
    /// Validates `cfg`, starts an effect pool and the monitor worker.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad config or an execution error if a
    /// thread cannot be spawned.
    pub fn start(cfg: MonitorConfig, sinks: MonitorSinks, clock: Arc<dyn Clock>) -> DoorwatchResult<Self> {
        cfg.validate()?;
        let executor = EffectExecutor::pool(cfg.effect_workers, cfg.effect_queue_capacity)?;
        Self::with_executor(cfg, sinks, clock, executor)
    }

    /// Like [`MonitorRuntime::start`] but with a caller-supplied executor.
    ///
    /// # Errors
    ///
    /// Same as [`MonitorRuntime::start`].
    pub fn with_executor(
        cfg: MonitorConfig,
        sinks: MonitorSinks,
        clock: Arc<dyn Clock>,
        executor: EffectExecutor,
    ) -> DoorwatchResult<Self> {
        cfg.validate()?;
        let capacity = cfg.fragment_queue_capacity.max(1);
        let (inbox_tx, inbox_rx) = bounded::<Input>(capacity);

        let monitor = PresenceMonitor::new(&cfg, sinks, executor.clone(), clock);
        let status = monitor.status_board();
        let poller = Poller::new(cfg.poll_interval());

        let join = thread::Builder::new()
            .name("doorwatch-monitor".to_string())
            .spawn(move || worker_loop(monitor, poller, inbox_rx))
            .map_err(|e| {
                DoorwatchError::Execution(ExecutionError::Spawn {
                    name: "doorwatch-monitor".to_string(),
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            handle: MonitorHandle {
                inbox: inbox_tx,
                capacity,
                dropped_fragments: Arc::new(AtomicU64::new(0)),
            },
            status,
            executor,
            join: Mutex::new(Some(join)),
        })
    }

    /// A sender for fragments and lifecycle signals.
    #[must_use]
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
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

    /// Side effects dropped because the effect queue was full.
    #[must_use]
    pub fn dropped_effects(&self) -> u64 {
        self.executor.dropped()
    }

    /// Status snapshots dropped because a subscriber was full.
    #[must_use]
    pub fn dropped_status_events(&self) -> u64 {
        self.status.dropped_events()
    }
}

impl Drop for MonitorRuntime {
    fn drop(&mut self) {
        // Handles may outlive the runtime and keep the inbox open, so ask the
        // worker to stop explicitly before joining it.
        let _ = self.handle.inbox.send(Input::Shutdown);
        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for MonitorRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRuntime")
            .field("status", &self.status())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

fn worker_loop(mut monitor: PresenceMonitor, mut poller: Poller, inbox: Receiver<Input>) {
    loop {
        let ticks = poller.ticks().clone();
        select! {
            recv(inbox) -> msg => {
                match msg {
                    Ok(Input::Text(text)) => {
                        monitor.on_fragment(&text);
                    }
                    Ok(Input::Bytes(bytes)) => {
                        monitor.on_bytes(&bytes);
                    }
                    Ok(Input::Opened) => {
                        monitor.on_opened();
                        poller.start();
                    }
                    Ok(Input::Closed) => {
                        poller.stop();
                        monitor.on_closed();
                    }
                    Ok(Input::DeviceRemoved) => {
                        poller.stop();
                        monitor.on_device_removed();
                    }
                    Ok(Input::ResetLogGate) => monitor.reset_log_gate(),
                    Ok(Input::Flush { reply }) => {
                        let _ = reply.send(());
                    }
                    Ok(Input::Shutdown) | Err(_) => break,
                }
            }
            recv(ticks) -> tick => {
                if tick.is_ok() {
                    monitor.on_tick();
                } else {
                    warn!("poll tick channel closed");
                    poller.stop();
                }
            }
        }
    }
    debug!("monitor worker exiting");
}
