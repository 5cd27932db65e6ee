//! WorkItem trait - the unit of work handed to executors
//!
//! # 使用例
//! ```ignore
//! struct Fetch {
//!     url: String,
//! }
//!
//! #[async_trait]
//! impl WorkItem for Fetch {
//!     type Output = Result<usize, String>;
//!
//!     async fn run(self: Box<Self>) -> Self::Output {
//!         download(&self.url).await.map(|body| body.len())
//!     }
//! }
//! ```
//!
//! Any input the action needs is captured by the item itself; `run` takes no
//! arguments. Success and failure are whatever `Output` says they are.

use std::future::Future;

use async_trait::async_trait;

/// A unit of work executed exactly once by whichever executor dequeues it.
#[async_trait]
pub trait WorkItem: Send + 'static {
    type Output: Send + 'static;

    async fn run(self: Box<Self>) -> Self::Output;
}

/// Type-erased work item as stored in the intake buffer.
pub type BoxedWork<R> = Box<dyn WorkItem<Output = R>>;

/// Adapter turning an async closure into a [`WorkItem`]. See [`work_fn`].
pub struct FnWork<F>(F);

/// Wrap `f` so that its future becomes the work item's action.
///
/// ```ignore
/// queue.add_work(work_fn(move || async move { n * 2 })).await;
/// ```
pub fn work_fn<F, Fut>(f: F) -> FnWork<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    FnWork(f)
}

#[async_trait]
impl<F, Fut> WorkItem for FnWork<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    type Output = Fut::Output;

    async fn run(self: Box<Self>) -> Self::Output {
        (self.0)().await
    }
}

/// Adapter running a synchronous closure on tokio's blocking pool.
/// See [`blocking`].
pub struct BlockingWork<F>(F);

/// Wrap a CPU-bound or blocking closure as a [`WorkItem`].
///
/// The closure runs via `spawn_blocking` so it never stalls an executor's
/// runtime thread. A panic inside it is propagated to the executor, which
/// handles it like any other panicking item.
pub fn blocking<F, R>(f: F) -> BlockingWork<F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    BlockingWork(f)
}

#[async_trait]
impl<F, R> WorkItem for BlockingWork<F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    async fn run(self: Box<Self>) -> R {
        let f = self.0;
        match tokio::task::spawn_blocking(f).await {
            Ok(out) => out,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // only happens when the runtime is shutting down underneath us
            Err(err) => panic!("blocking work was cancelled: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Square {
        n: u64,
    }

    #[async_trait]
    impl WorkItem for Square {
        type Output = u64;

        async fn run(self: Box<Self>) -> u64 {
            self.n * self.n
        }
    }

    #[tokio::test]
    async fn custom_item_runs() {
        let item: BoxedWork<u64> = Box::new(Square { n: 12 });
        assert_eq!(item.run().await, 144);
    }

    #[tokio::test]
    async fn closure_item_runs() {
        let name = String::from("spindle");
        let item = work_fn(move || async move { format!("hello, {name}") });
        assert_eq!(Box::new(item).run().await, "hello, spindle");
    }

    #[tokio::test]
    async fn closure_item_can_yield_errors() {
        let item = work_fn(|| async { Err::<u8, _>("bad input".to_string()) });
        assert_eq!(Box::new(item).run().await, Err("bad input".to_string()));
    }

    #[tokio::test]
    async fn blocking_item_runs_off_runtime() {
        let item = blocking(|| (1..=10u32).sum::<u32>());
        assert_eq!(Box::new(item).run().await, 55);
    }

    #[tokio::test]
    #[should_panic(expected = "blocking boom")]
    async fn blocking_item_panic_is_propagated() {
        let item = blocking(|| -> u8 { panic!("blocking boom") });
        Box::new(item).run().await;
    }
}
