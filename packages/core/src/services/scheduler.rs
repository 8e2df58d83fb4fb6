//! Coalescing scheduler.
//!
//! At most one pending task per [`TaskKind`]. Scheduling a kind that is
//! already pending aborts the waiting task and arms a new one, so a burst of
//! store changes collapses into a single pass that sees the latest state.
//!
//! A task waits for its [`Trigger`]: either the next animation frame
//! (released by [`CoalescingScheduler::frame_tick`]) or a fallback timer,
//! whichever comes first, or a plain delay. Once the trigger fires the task
//! leaves the pending set and runs its job to completion; only waiting tasks
//! can be cancelled.

use crate::models::ShapeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// Kinds of coalesced work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Sweep,
    Normalize,
    /// Suggestion lookup for one search overlay
    Suggest(ShapeId),
}

/// When an armed task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Next animation frame, or after the fallback if no frame arrives
    NextFrameOr(Duration),
    /// After a fixed delay (debounce)
    After(Duration),
}

struct PendingTask {
    generation: u64,
    handle: AbortHandle,
}

/// Debounces work by kind
pub struct CoalescingScheduler {
    frame: Arc<Notify>,
    pending: Arc<Mutex<HashMap<TaskKind, PendingTask>>>,
    next_generation: AtomicU64,
}

impl Default for CoalescingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CoalescingScheduler {
    pub fn new() -> Self {
        Self {
            frame: Arc::new(Notify::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Arm `job` for `kind`, replacing any task of that kind still waiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, kind: TaskKind, trigger: Trigger, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let frame = self.frame.clone();
        let pending = self.pending.clone();
        let task_kind = kind.clone();

        // Held across spawn so the task cannot fire before it is registered.
        let mut tasks = self.pending.lock();
        if let Some(previous) = tasks.remove(&kind) {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            match trigger {
                Trigger::NextFrameOr(fallback) => {
                    tokio::select! {
                        _ = frame.notified() => {}
                        _ = tokio::time::sleep(fallback) => {}
                    }
                }
                Trigger::After(delay) => tokio::time::sleep(delay).await,
            }

            {
                let mut tasks = pending.lock();
                let current = tasks.get(&task_kind).map(|task| task.generation) == Some(generation);
                if !current {
                    return;
                }
                tasks.remove(&task_kind);
            }
            job.await;
        });

        tasks.insert(
            kind,
            PendingTask {
                generation,
                handle: handle.abort_handle(),
            },
        );
    }

    /// Animation-frame callback: releases every task waiting on a frame.
    pub fn frame_tick(&self) {
        self.frame.notify_waiters();
    }

    /// Cancel the waiting task of `kind`. Returns whether one was pending.
    pub fn cancel(&self, kind: &TaskKind) -> bool {
        match self.pending.lock().remove(kind) {
            Some(task) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, task) in self.pending.lock().drain() {
            task.handle.abort();
        }
    }

    pub fn is_pending(&self, kind: &TaskKind) -> bool {
        self.pending.lock().contains_key(kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for CoalescingScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
