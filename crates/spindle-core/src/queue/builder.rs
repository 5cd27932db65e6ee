//! WorkQueueBuilder - queue construction
//!
//! # 使用例
//! ```ignore
//! let queue = WorkQueue::builder()
//!     .intake_capacity(32)
//!     .result_capacity(8)
//!     .on_panic(|p| Err(p.to_string()))
//!     .build();
//! ```

use std::sync::Arc;

use super::{PanicHook, WorkQueue};
use crate::config::QueueConfig;
use crate::error::WorkPanic;

/// Builds a [`WorkQueue`]. Capacities default to [`QueueConfig::default`].
pub struct WorkQueueBuilder<R> {
    intake_capacity: usize,
    result_capacity: usize,
    on_panic: Option<PanicHook<R>>,
}

impl<R: Send + 'static> WorkQueueBuilder<R> {
    pub fn new() -> Self {
        Self::from_config(&QueueConfig::default())
    }

    /// Take both capacities from `config`. `config.executors` is left for
    /// [`WorkQueue::start`].
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            intake_capacity: config.intake_capacity,
            result_capacity: config.result_capacity,
            on_panic: None,
        }
    }

    pub fn intake_capacity(mut self, capacity: usize) -> Self {
        self.intake_capacity = capacity;
        self
    }

    pub fn result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = capacity;
        self
    }

    /// Turn a panicking work item into a regular result.
    ///
    /// Without a hook the panic is logged and the item produces no result.
    pub fn on_panic<F>(mut self, recover: F) -> Self
    where
        F: Fn(WorkPanic) -> R + Send + Sync + 'static,
    {
        self.on_panic = Some(Arc::new(recover));
        self
    }

    pub fn build(self) -> WorkQueue<R> {
        WorkQueue::from_parts(self.intake_capacity, self.result_capacity, self.on_panic)
    }
}

impl<R: Send + 'static> Default for WorkQueueBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
