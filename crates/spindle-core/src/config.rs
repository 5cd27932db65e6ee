//! Queue sizing, loadable from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Capacities and pool size for a [`WorkQueue`](crate::WorkQueue).
///
/// Missing fields fall back to their defaults:
/// ```json
/// { "intake_capacity": 64, "executors": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pending items the intake buffer holds before `add_work` waits.
    /// 0 means synchronous hand-off.
    pub intake_capacity: usize,

    /// Results buffered before executors wait for a consumer.
    /// 0 means synchronous hand-off.
    pub result_capacity: usize,

    /// Executors passed to `start`.
    pub executors: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 16,
            result_capacity: 16,
            executors: 4,
        }
    }
}

impl QueueConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
