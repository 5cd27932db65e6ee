//! WorkQueue: bounded intake, executor pool, bounded results, abort.
//!
//! # フロー
//! 1. producer が `add_work` で intake に積む（満杯なら待つ）
//! 2. executor が intake から取り出して実行し、結果を results に積む
//! 3. `finish` 後は intake を掃き出してから executor が終了する
//! 4. `abort` 後は実行中の 1 件だけ完了させ、残りは捨てる
//! 5. coordinator が全 executor の終了を待って results を閉じる

mod builder;
mod executor;
mod results;

pub use builder::WorkQueueBuilder;
pub use results::Results;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::channel::{self, Channel, SendError};
use crate::error::{QueueError, WorkPanic};
use crate::observability::{Counters, QueueCounts};
use crate::work::{BoxedWork, WorkItem};

pub(crate) type PanicHook<R> = Arc<dyn Fn(WorkPanic) -> R + Send + Sync>;

/// State shared by the queue handles, the executors and the coordinator.
pub(crate) struct Inner<R> {
    intake: Channel<BoxedWork<R>>,
    results: Channel<R>,
    abort: AbortSignal,
    counters: Counters,
    on_panic: Option<PanicHook<R>>,
    started: AtomicBool,
}

/// A bounded work queue feeding a fixed pool of executors.
///
/// Cloning yields another handle to the same queue, so producers, the owner
/// and consumers may live in different tasks.
///
/// # Liveness
/// Results only close after `start` has been called and the pool has exited
/// (after `finish` drained the intake, or after `abort`). A queue that is
/// never started never closes its result stream.
pub struct WorkQueue<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for WorkQueue<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Send + 'static> WorkQueue<R> {
    /// Create a queue with the given buffer capacities and no executors.
    ///
    /// A capacity of 0 makes that buffer a synchronous hand-off.
    pub fn new(intake_capacity: usize, result_capacity: usize) -> Self {
        Self::builder()
            .intake_capacity(intake_capacity)
            .result_capacity(result_capacity)
            .build()
    }

    pub fn builder() -> WorkQueueBuilder<R> {
        WorkQueueBuilder::new()
    }

    fn from_parts(
        intake_capacity: usize,
        result_capacity: usize,
        on_panic: Option<PanicHook<R>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                intake: channel::bounded(intake_capacity),
                results: channel::bounded(result_capacity),
                abort: AbortSignal::new(),
                counters: Counters::default(),
                on_panic,
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue `item`, waiting while the intake buffer is full.
    ///
    /// After `abort` the item is silently dropped.
    ///
    /// # Panics
    /// If called after [`finish`](Self::finish).
    pub async fn add_work<W>(&self, item: W)
    where
        W: WorkItem<Output = R>,
    {
        self.add_boxed(Box::new(item)).await;
    }

    /// [`add_work`](Self::add_work) for an already boxed item.
    pub async fn add_boxed(&self, item: BoxedWork<R>) {
        if let Err(err) = self.try_add_boxed(item).await {
            panic!("add_work called after finish: {err}");
        }
    }

    /// Like [`add_work`](Self::add_work), but reports a finished queue as
    /// [`QueueError::Finished`] instead of panicking.
    pub async fn try_add_work<W>(&self, item: W) -> Result<(), QueueError>
    where
        W: WorkItem<Output = R>,
    {
        self.try_add_boxed(Box::new(item)).await
    }

    async fn try_add_boxed(&self, item: BoxedWork<R>) -> Result<(), QueueError> {
        let counters = &self.inner.counters;
        match self.inner.intake.send(item).await {
            Ok(()) => {
                Counters::bump(&counters.submitted);
                Ok(())
            }
            Err(SendError::Closed(_)) => Err(QueueError::Finished),
            Err(SendError::Discarded(_)) => {
                Counters::bump(&counters.submitted);
                Counters::bump(&counters.discarded);
                debug!("queue aborted; submitted work dropped");
                Ok(())
            }
        }
    }

    /// Declare that no more work will be added.
    ///
    /// Executors keep draining whatever is already buffered, then exit.
    pub fn finish(&self) {
        if self.inner.intake.close() {
            info!(
                pending = self.inner.intake.len(),
                "queue finished; draining buffered work"
            );
        } else {
            warn!("finish called more than once");
        }
    }

    /// Stop every executor after its current item.
    ///
    /// Unclaimed work is dropped without running, and results computed after
    /// the abort are not delivered. Calling it again does nothing.
    pub fn abort(&self) {
        if !self.inner.abort.trigger() {
            debug!("abort already signaled");
            return;
        }
        // the latch fires before the intake is emptied so that an executor
        // racing the discard still sees the abort before running its item
        let dropped = self.inner.intake.discard();
        Counters::add(&self.inner.counters.discarded, dropped as u64);
        info!(discarded = dropped, "queue aborted");
    }

    /// Spawn `executors` executor tasks and the coordinator on the current
    /// tokio runtime.
    ///
    /// A queue runs a single pool: a second call fails with
    /// [`QueueError::AlreadyStarted`] and leaves the first pool untouched.
    pub fn start(&self, executors: usize) -> Result<(), QueueError> {
        if executors == 0 {
            return Err(QueueError::NoExecutors);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyStarted);
        }

        executor::spawn_pool(&handle, executors, Arc::clone(&self.inner));
        info!(executors, "queue started");
        Ok(())
    }

    /// The result stream. Every call returns a handle to the same stream.
    pub fn results(&self) -> Results<R> {
        Results::new(self.inner.results.clone())
    }

    pub fn counts(&self) -> QueueCounts {
        self.inner.counters.snapshot(self.inner.intake.len())
    }

    pub fn intake_capacity(&self) -> usize {
        self.inner.intake.capacity()
    }

    pub fn result_capacity(&self) -> usize {
        self.inner.results.capacity()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.intake.is_closed()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_triggered()
    }
}
