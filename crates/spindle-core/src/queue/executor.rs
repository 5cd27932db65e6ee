//! Executor pool and the coordinator that closes the result stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::Inner;
use crate::error::WorkPanic;
use crate::observability::Counters;
use crate::work::BoxedWork;

/// Spawn `n` executors plus the coordinator on `handle`.
pub(super) fn spawn_pool<R: Send + 'static>(handle: &Handle, n: usize, inner: Arc<Inner<R>>) {
    let joins: Vec<JoinHandle<()>> = (0..n)
        .map(|executor_id| {
            let inner = Arc::clone(&inner);
            inner.counters.running.fetch_add(1, Ordering::Relaxed);
            handle.spawn(executor_loop(executor_id, inner))
        })
        .collect();

    handle.spawn(coordinate(joins, inner));
}

/// Wait for every executor, then close the result buffer.
async fn coordinate<R: Send + 'static>(joins: Vec<JoinHandle<()>>, inner: Arc<Inner<R>>) {
    for (executor_id, join) in joins.into_iter().enumerate() {
        if let Err(err) = join.await {
            error!(executor = executor_id, error = %err, "executor terminated abnormally");
        }
    }
    inner.results.close();
    debug!("all executors exited; result stream closed");
}

/// Keeps `Counters::running` accurate however the executor exits.
struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

async fn executor_loop<R: Send + 'static>(executor_id: usize, inner: Arc<Inner<R>>) {
    let _running = RunningGuard(&inner.counters.running);
    debug!(executor = executor_id, "executor started");

    loop {
        // intake 待ちは abort と競合させる（abort 優先）
        let item = tokio::select! {
            biased;
            _ = inner.abort.triggered() => break,
            item = inner.intake.recv() => item,
        };

        // None: finish 済みで intake が空
        let Some(item) = item else {
            break;
        };

        // abort と同時に取り出した item は実行しない
        if inner.abort.is_triggered() {
            Counters::bump(&inner.counters.discarded);
            break;
        }

        let Some(output) = execute(executor_id, item, &inner).await else {
            continue;
        };

        // an aborted executor must not sit on a full result buffer
        tokio::select! {
            biased;
            _ = inner.abort.triggered() => {
                Counters::bump(&inner.counters.discarded);
                debug!(executor = executor_id, "abort signaled; in-flight result discarded");
                break;
            }
            sent = inner.results.send(output) => {
                if sent.is_err() {
                    warn!(executor = executor_id, "result buffer closed while executors were running");
                    break;
                }
                Counters::bump(&inner.counters.completed);
            }
        }
    }

    debug!(executor = executor_id, "executor exited");
}

/// Run one item in its own task so a panic comes back as a `JoinError`
/// instead of unwinding through the executor.
async fn execute<R: Send + 'static>(
    executor_id: usize,
    item: BoxedWork<R>,
    inner: &Inner<R>,
) -> Option<R> {
    let outcome = tokio::spawn(item.run()).await;
    Counters::bump(&inner.counters.executed);

    match outcome {
        Ok(output) => Some(output),
        Err(err) if err.is_panic() => {
            Counters::bump(&inner.counters.panicked);
            let panic = WorkPanic::from_payload(err.into_panic());
            error!(executor = executor_id, error = %panic, "work item panicked");
            inner.on_panic.as_ref().map(|recover| recover(panic))
        }
        Err(err) => {
            error!(executor = executor_id, error = %err, "work item task was cancelled");
            None
        }
    }
}
