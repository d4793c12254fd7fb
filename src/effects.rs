//! Side-effect execution.
//!
//! Alerts and log writes must never block the core loop. The [`EffectExecutor`]
//! either runs them inline (deterministic, for tests and embedding) or hands
//! them to a small bounded worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::error::{DoorwatchError, DoorwatchResult, ExecutionError};

/// A unit of side-effect work.
pub type Effect = Box<dyn FnOnce() + Send + 'static>;

struct EffectPool {
    tx: Option<Sender<Effect>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl EffectPool {
    fn start(workers: usize, queue_capacity: usize) -> DoorwatchResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Effect>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Effect> = rx.clone();
            let name = format!("doorwatch-effects-{idx}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    while let Ok(effect) = rx.recv() {
                        effect();
                    }
                })
                .map_err(|e| {
                    DoorwatchError::Execution(ExecutionError::Spawn {
                        name,
                        message: e.to_string(),
                    })
                })?;
            handles.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            workers: handles,
            queue_capacity,
        })
    }

    fn try_submit(&self, effect: Effect) -> Result<(), ExecutionError> {
        let Some(tx) = &self.tx else {
            return Err(ExecutionError::Disconnected {
                path: "effects".to_string(),
            });
        };
        match tx.try_send(effect) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                path: "effects".to_string(),
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected {
                path: "effects".to_string(),
            }),
        }
    }
}

impl Drop for EffectPool {
    fn drop(&mut self) {
        // Close the channel: workers drain queued effects then exit.
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

enum Mode {
    Inline,
    Pool(EffectPool),
}

/// Runs side effects inline or on a worker pool.
///
/// Cloning shares the same pool.
#[derive(Clone)]
pub struct EffectExecutor {
    mode: Arc<Mode>,
    dropped: Arc<AtomicU64>,
}

impl EffectExecutor {
    /// Runs every effect immediately on the calling thread.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            mode: Arc::new(Mode::Inline),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a pool of `workers` threads with a bounded queue.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Spawn` if a worker thread cannot be created.
    pub fn pool(workers: usize, queue_capacity: usize) -> DoorwatchResult<Self> {
        Ok(Self {
            mode: Arc::new(Mode::Pool(EffectPool::start(workers, queue_capacity)?)),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Submits an effect without blocking. A full queue drops the effect.
    pub fn submit(&self, label: &'static str, effect: impl FnOnce() + Send + 'static) {
        match self.mode.as_ref() {
            Mode::Inline => effect(),
            Mode::Pool(pool) => {
                if let Err(err) = pool.try_submit(Box::new(effect)) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(effect = label, error = %err, "dropping side effect");
                }
            }
        }
    }

    /// Number of effects dropped because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns true if effects run on the caller's thread.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.mode.as_ref(), Mode::Inline)
    }
}

impl std::fmt::Debug for EffectExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectExecutor")
            .field("inline", &self.is_inline())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn inline_runs_immediately() {
        let exec = EffectExecutor::inline();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        exec.submit("test", move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_runs_off_thread() {
        let exec = EffectExecutor::pool(2, 16).unwrap();
        let (tx, rx) = bounded::<String>(1);
        exec.submit("test", move || {
            let name = thread::current().name().unwrap_or_default().to_string();
            let _ = tx.send(name);
        });
        let name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(name.starts_with("doorwatch-effects-"));
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let exec = EffectExecutor::pool(1, 1).unwrap();
        let (release_tx, release_rx) = bounded::<()>(0);
        let (started_tx, started_rx) = bounded::<()>(1);

        // Occupy the only worker.
        exec.submit("block", move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        });
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

        // One effect fits in the queue, the next is dropped.
        exec.submit("queued", || {});
        exec.submit("overflow", || {});
        assert_eq!(exec.dropped(), 1);

        release_tx.send(()).unwrap();
    }
}
