//! Background task dispatch and UI-thread synchronization.
//!
//! Blocking work (package scans, changelog fetches) runs on a fixed pool of
//! worker threads fed by a bounded queue. Each submitted task belongs to a
//! [`TaskSlot`] and carries a monotonically increasing [`RequestId`]; only the
//! latest request in a slot is live. Submitting a new request cancels the
//! previous one's token, and [`TaskDispatcher::poll`] drops completions that
//! are no longer the latest for their slot. The UI thread is the only caller
//! of `submit` and `poll`, so all state mutation stays on it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

use super::changelog::Changelog;
use super::package::PackageRecord;

/// Identifier of a submitted task.
pub type RequestId = u64;

/// Category of background work; each slot has at most one live request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    /// Installed package scan
    Scan,
    /// Changelog fetch for the selected package
    Changelog,
}

/// Result payloads produced by the viewer's background tasks.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Output of a package scan
    Packages(Vec<PackageRecord>),
    /// Changelog for one package
    Changelog {
        /// Package the changelog was fetched for
        package: String,
        /// Fetched changelog
        changelog: Changelog,
    },
}

/// Cooperative cancellation flag shared between the dispatcher and one task.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished task, tagged with where it came from.
#[derive(Debug)]
pub struct Completion<T> {
    /// Slot the task was submitted to
    pub slot: TaskSlot,
    /// Request identifier assigned at submission
    pub id: RequestId,
    /// Task output
    pub result: T,
}

/// Errors from submitting work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The job queue is at capacity.
    #[error("background queue is full")]
    QueueFull,

    /// The dispatcher has shut down.
    #[error("background workers have shut down")]
    Closed,
}

/// How long shutdown waits for running jobs before detaching their workers.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

type Job<T> = Box<dyn FnOnce(&CancellationToken) -> T + Send + 'static>;

struct QueuedJob<T> {
    slot: TaskSlot,
    id: RequestId,
    token: CancellationToken,
    job: Job<T>,
}

#[derive(Debug)]
struct SlotState {
    latest: RequestId,
    token: CancellationToken,
    delivered: bool,
}

/// Bounded worker pool with per-slot stale-result rejection.
pub struct TaskDispatcher<T: Send + 'static> {
    job_tx: Option<SyncSender<QueuedJob<T>>>,
    completion_rx: Receiver<Completion<T>>,
    slots: Mutex<HashMap<TaskSlot, SlotState>>,
    next_id: AtomicU64,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> std::fmt::Debug for TaskDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("workers", &self.workers.len())
            .field("slots", &*self.slots.lock())
            .finish()
    }
}

impl<T: Send + 'static> TaskDispatcher<T> {
    /// Start `threads` workers sharing a queue of `queue_capacity` jobs.
    ///
    /// Both values are clamped to at least 1.
    pub fn new(threads: usize, queue_capacity: usize) -> Self {
        let (job_tx, job_rx) = mpsc::sync_channel::<QueuedJob<T>>(queue_capacity.max(1));
        let (completion_tx, completion_rx) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..threads.max(1))
            .map(|index| {
                let job_rx = Arc::clone(&job_rx);
                let completion_tx = completion_tx.clone();
                thread::Builder::new()
                    .name(format!("viewer-worker-{index}"))
                    .spawn(move || worker_loop(&job_rx, &completion_tx))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to spawn worker thread");
                    None
                }
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            completion_rx,
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            workers,
        }
    }

    /// Queue a job in `slot`, superseding any earlier request in that slot.
    ///
    /// Never blocks: a full queue is reported as [`DispatchError::QueueFull`]
    /// and leaves the slot's current request untouched.
    pub fn submit<F>(&self, slot: TaskSlot, job: F) -> Result<RequestId, DispatchError>
    where
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let job_tx = self.job_tx.as_ref().ok_or(DispatchError::Closed)?;
        if self.workers.is_empty() {
            return Err(DispatchError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        let queued = QueuedJob { slot, id, token: token.clone(), job: Box::new(job) };

        let mut slots = self.slots.lock();
        match job_tx.try_send(queued) {
            Ok(()) => {
                let state = SlotState { latest: id, token, delivered: false };
                if let Some(previous) = slots.insert(slot, state) {
                    previous.token.cancel();
                    tracing::debug!(?slot, superseded = previous.latest, id, "Superseded request");
                }
                Ok(id)
            }
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::Closed),
        }
    }

    /// Drain finished tasks without blocking, keeping only live ones.
    pub fn poll(&self) -> Vec<Completion<T>> {
        let mut live = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            let mut slots = self.slots.lock();
            match slots.get_mut(&completion.slot) {
                Some(state) if state.latest == completion.id => {
                    state.delivered = true;
                    live.push(completion);
                }
                _ => {
                    tracing::debug!(
                        slot = ?completion.slot,
                        id = completion.id,
                        "Discarded stale completion"
                    );
                }
            }
        }
        live
    }

    /// Whether the latest request in `slot` has not been delivered yet.
    pub fn is_pending(&self, slot: TaskSlot) -> bool {
        self.slots.lock().get(&slot).is_some_and(|state| !state.delivered)
    }

    /// Cancel the live request in `slot`; its result will be discarded.
    pub fn cancel(&self, slot: TaskSlot) {
        if let Some(state) = self.slots.lock().remove(&slot) {
            state.token.cancel();
        }
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Cancel everything, close the queue and join the workers.
    ///
    /// Queued jobs are skipped and running ones see their token cancelled.
    /// A worker still busy after a short grace period is detached; its
    /// result has nowhere to go once the dispatcher is gone.
    pub fn shutdown(&mut self) {
        for (_, state) in self.slots.lock().drain() {
            state.token.cancel();
        }
        self.job_tx.take();

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        for handle in self.workers.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::debug!(worker = ?handle.thread().name(), "Detached busy worker");
            }
        }
    }
}

impl<T: Send + 'static> Drop for TaskDispatcher<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<T>(job_rx: &Mutex<Receiver<QueuedJob<T>>>, completion_tx: &Sender<Completion<T>>) {
    loop {
        let next = job_rx.lock().recv();
        let Ok(queued) = next else {
            break;
        };

        if queued.token.is_cancelled() {
            tracing::debug!(slot = ?queued.slot, id = queued.id, "Skipped cancelled job");
            continue;
        }

        let result = (queued.job)(&queued.token);
        let completion = Completion { slot: queued.slot, id: queued.id, result };
        if completion_tx.send(completion).is_err() {
            break;
        }
    }
}
