//! Per-index background work queue.
//!
//! Each index kind owns one scheduler with a single worker thread, so index
//! tasks for that kind run strictly in submission order. Every task is
//! assigned a generation when it is accepted; once the task finishes (or
//! panics) the backend's applied generation is raised to it, which is what
//! readers wait on.
//!
//! A full queue makes `submit` wait for the worker to free a slot, so work
//! for an already committed write is never dropped. `try_submit` rejects
//! instead.
//!
//! In inline mode the task runs on the submitting thread before `submit`
//! returns, under a lock that keeps generations in order.

use crate::database::config::IndexMode;
use crate::indexer::IndexKind;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use termstore_core::{Error, Result};
use termstore_search::SearchBackend;
use tracing::{debug, error};

/// Scheduler metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed.
    pub active_tasks: usize,
    /// Total number of tasks completed since scheduler creation.
    pub tasks_completed: u64,
    /// Highest generation handed out.
    pub requested_generation: u64,
}

struct TaskEnvelope {
    generation: u64,
    work: Box<dyn FnOnce() + Send>,
}

struct SchedulerInner {
    kind: IndexKind,
    backend: Arc<dyn SearchBackend>,
    queue: Mutex<VecDeque<TaskEnvelope>>,
    work_ready: Condvar,
    space_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    generation: AtomicU64,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
    inline: Mutex<()>,
}

/// FIFO scheduler for one index.
pub struct IndexScheduler {
    inner: Arc<SchedulerInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
    mode: IndexMode,
}

impl IndexScheduler {
    /// Create a scheduler; background mode spawns `termstore-index-<kind>`.
    ///
    /// # Errors
    ///
    /// `IoError` if the worker thread cannot be spawned.
    pub fn new(
        kind: IndexKind,
        backend: Arc<dyn SearchBackend>,
        mode: IndexMode,
        max_queue_depth: usize,
    ) -> Result<Self> {
        let inner = Arc::new(SchedulerInner {
            kind,
            generation: AtomicU64::new(backend.applied_generation()),
            backend,
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            space_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
            inline: Mutex::new(()),
        });

        let worker = match mode {
            IndexMode::Background => {
                let inner_clone = Arc::clone(&inner);
                let handle = std::thread::Builder::new()
                    .name(format!("termstore-index-{}", kind))
                    .spawn(move || worker_loop(&inner_clone))?;
                Some(handle)
            }
            IndexMode::Inline => None,
        };

        Ok(Self {
            inner,
            worker: Mutex::new(worker),
            mode,
        })
    }

    /// Index kind served.
    pub fn kind(&self) -> IndexKind {
        self.inner.kind
    }

    /// Submit a task; returns the generation that marks its completion.
    ///
    /// Waits while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// `Backpressure` if the scheduler has been shut down.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<u64> {
        self.enqueue(Box::new(work), true)
    }

    /// Submit a task unless the queue is at capacity.
    ///
    /// # Errors
    ///
    /// `Backpressure` if the queue is full or the scheduler has been shut
    /// down.
    pub fn try_submit(&self, work: impl FnOnce() + Send + 'static) -> Result<u64> {
        self.enqueue(Box::new(work), false)
    }

    fn enqueue(&self, work: Box<dyn FnOnce() + Send>, wait: bool) -> Result<u64> {
        // Workers have been joined after shutdown, the task would never run
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(self.shut_down());
        }

        if self.mode == IndexMode::Inline {
            let _serial = self.inner.inline.lock();
            let generation = self.inner.generation.fetch_add(1, AtomicOrdering::AcqRel) + 1;
            self.inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
            let _guard = ActiveTaskGuard { inner: &self.inner };
            run_task(&self.inner, TaskEnvelope { generation, work });
            return Ok(generation);
        }

        let generation = {
            let mut queue = self.inner.queue.lock();
            while queue.len() >= self.inner.max_queue_depth {
                if !wait {
                    return Err(Error::Backpressure(format!(
                        "{} index queue is full ({} tasks)",
                        self.inner.kind,
                        queue.len()
                    )));
                }
                if self.inner.shutdown.load(AtomicOrdering::Acquire) {
                    return Err(self.shut_down());
                }
                self.inner.space_ready.wait(&mut queue);
            }
            if self.inner.shutdown.load(AtomicOrdering::Acquire) {
                return Err(self.shut_down());
            }
            // Assigned under the queue lock so generations follow queue order
            let generation = self.inner.generation.fetch_add(1, AtomicOrdering::AcqRel) + 1;
            queue.push_back(TaskEnvelope { generation, work });
            generation
        };

        self.inner.work_ready.notify_one();
        Ok(generation)
    }

    fn shut_down(&self) -> Error {
        Error::Backpressure(format!("{} index scheduler is shut down", self.inner.kind))
    }

    /// Highest generation handed out.
    pub fn requested_generation(&self) -> u64 {
        self.inner.generation.load(AtomicOrdering::Acquire)
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// The worker keeps running after drain completes.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while !queue.is_empty() || self.inner.active_tasks.load(AtomicOrdering::Acquire) > 0 {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Signal the worker to exit after the remaining tasks and join it.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);

        // Notify under the queue lock so a worker between its shutdown check
        // and wait() cannot miss the wakeup
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
            self.inner.space_ready.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of scheduler metrics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queue_depth: self.inner.queue.lock().len(),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
            requested_generation: self.requested_generation(),
        }
    }
}

impl Drop for IndexScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements `active_tasks` and notifies drain waiters on drop, so a
/// panicking task cannot leave `drain()` waiting forever.
struct ActiveTaskGuard<'a> {
    inner: &'a SchedulerInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner
            .tasks_completed
            .fetch_add(1, AtomicOrdering::Relaxed);

        // drain() holds the queue lock while checking and waiting
        if prev_active == 1 {
            let queue = self.inner.queue.lock();
            if queue.is_empty() {
                self.inner.drain_cond.notify_all();
            }
        }
    }
}

/// Run one task and publish its generation, even if it panicked.
fn run_task(inner: &SchedulerInner, task: TaskEnvelope) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task.work)) {
        error!(
            target: "termstore::index",
            kind = %inner.kind,
            generation = task.generation,
            "index task panicked: {:?}",
            e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
        );
    }
    inner.backend.commit(task.generation);
    debug!(target: "termstore::index", kind = %inner.kind, generation = task.generation, "Applied generation");
}

fn worker_loop(inner: &SchedulerInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    inner.space_ready.notify_one();
                    break task;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };
        run_task(inner, task);
    }
}
