// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded worker pool with per-destination FIFO lanes.
//!
//! Every collaborator gets its own lane: jobs submitted to one lane run one
//! at a time in submission order, while lanes run concurrently up to the
//! pool size. Jobs are guarded: an error or a panic is logged with the lane
//! and task name and never reaches the submitter or stops the lane.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Notify, Semaphore, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use ripple_core::RippleError;

type Job = BoxFuture<'static, ()>;

/// Count of submitted jobs that have not finished.
#[derive(Default)]
struct Inflight {
    count: AtomicUsize,
    idle: Notify,
}

impl Inflight {
    fn enter(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn exit(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }
}

pub struct TaskPool {
    lanes: DashMap<String, mpsc::UnboundedSender<Job>>,
    permits: Arc<Semaphore>,
    inflight: Arc<Inflight>,
    tracker: TaskTracker,
    closed: AtomicBool,
}

impl TaskPool {
    /// Create a pool running at most `size` jobs at once.
    pub fn new(size: usize) -> Self {
        Self {
            lanes: DashMap::new(),
            permits: Arc::new(Semaphore::new(size.max(1))),
            inflight: Arc::new(Inflight::default()),
            tracker: TaskTracker::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue `fut` on `lane`. Returns false if the pool is closed.
    pub fn submit_guarded<F, T>(&self, lane: &str, task: &str, fut: F) -> bool
    where
        F: Future<Output = Result<T, RippleError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            warn!(lane, task, "pool is closed, dropping task");
            return false;
        }
        self.inflight.enter();
        let job = guard(lane.to_string(), task.to_string(), Arc::clone(&self.inflight), fut);
        if self.lane(lane).send(job).is_err() {
            self.inflight.exit();
            return false;
        }
        true
    }

    /// Run `fut` outside any lane, still bounded by the pool size.
    pub fn spawn_guarded<F, T>(&self, task: &str, fut: F) -> bool
    where
        F: Future<Output = Result<T, RippleError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            warn!(task, "pool is closed, dropping task");
            return false;
        }
        self.inflight.enter();
        let permits = Arc::clone(&self.permits);
        let job = guard(String::new(), task.to_string(), Arc::clone(&self.inflight), fut);
        self.tracker.spawn(async move {
            let _permit = permits.acquire_owned().await;
            job.await;
        });
        true
    }

    fn lane(&self, name: &str) -> mpsc::UnboundedSender<Job> {
        if let Some(tx) = self.lanes.get(name) {
            return tx.clone();
        }
        self.lanes
            .entry(name.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                debug!(lane = name, "starting pool lane");
                self.tracker.spawn(run_lane(rx, Arc::clone(&self.permits)));
                tx
            })
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until no job is queued or running, then stop every lane.
    ///
    /// Running jobs may submit follow-up work while the pool drains; the
    /// follow-ups run before the pool stops. Anything submitted after the
    /// pool is idle is dropped.
    pub async fn close(&self) {
        self.inflight.wait_idle().await;
        self.closed.store(true, Ordering::Release);
        self.lanes.clear();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("task pool drained");
    }
}

async fn run_lane(mut rx: mpsc::UnboundedReceiver<Job>, permits: Arc<Semaphore>) {
    while let Some(job) = rx.recv().await {
        // The semaphore is never closed, so a permit is always granted.
        let _permit = Arc::clone(&permits).acquire_owned().await;
        job.await;
    }
}

fn guard<F, T>(lane: String, task: String, inflight: Arc<Inflight>, fut: F) -> Job
where
    F: Future<Output = Result<T, RippleError>> + Send + 'static,
    T: Send + 'static,
{
    Box::pin(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(lane = %lane, task = %task, error = %e, "pool task failed"),
            Err(panic) => error!(
                lane = %lane,
                task = %task,
                panic = %panic_message(panic.as_ref()),
                "pool task panicked"
            ),
        }
        inflight.exit();
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
