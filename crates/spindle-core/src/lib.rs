//! spindle-core
//!
//! A bounded work queue that fans work items out to a fixed pool of tokio
//! executors and fans their results back in through a bounded result stream.
//!
//! # モジュール構成
//! - **queue**: `WorkQueue`（intake / executor pool / results / abort）と builder
//! - **work**: `WorkItem` trait と closure / blocking 用アダプタ
//! - **config**: `QueueConfig`（JSON から読み込み可能）
//! - **observability**: `QueueCounts`
//! - **error**: `QueueError`, `WorkPanic`, `ConfigError`
//!
//! # Lifecycle
//! ```ignore
//! let queue = WorkQueue::new(16, 16);
//! queue.start(4)?;
//!
//! let results = queue.results();
//! let producer = tokio::spawn({
//!     let queue = queue.clone();
//!     async move {
//!         for n in 0..100u64 {
//!             queue.add_work(work_fn(move || async move { n * n })).await;
//!         }
//!         queue.finish();
//!     }
//! });
//!
//! while let Some(square) = results.recv().await {
//!     println!("{square}");
//! }
//! ```

mod abort;
mod channel;

pub mod config;
pub mod error;
pub mod observability;
pub mod queue;
pub mod work;

pub use self::channel::TryRecvError;
pub use self::config::QueueConfig;
pub use self::error::{ConfigError, QueueError, WorkPanic};
pub use self::observability::QueueCounts;
pub use self::queue::{Results, WorkQueue, WorkQueueBuilder};
pub use self::work::{BlockingWork, BoxedWork, FnWork, WorkItem, blocking, work_fn};
