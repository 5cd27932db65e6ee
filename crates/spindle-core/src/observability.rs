use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of a queue's activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Items accepted by `add_work`.
    pub submitted: u64,
    /// Items currently waiting in the intake buffer.
    pub queued: usize,
    /// Executors currently alive.
    pub running: usize,
    /// Items whose action has finished (including panics).
    pub executed: u64,
    /// Results deposited into the result buffer.
    pub completed: u64,
    /// Items or results dropped because of an abort.
    pub discarded: u64,
    /// Items whose action panicked.
    pub panicked: u64,
}

/// Counters shared by the queue handle and its executors.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicU64,
    pub(crate) running: AtomicUsize,
    pub(crate) executed: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) panicked: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, queued: usize) -> QueueCounts {
        QueueCounts {
            submitted: self.submitted.load(Ordering::Relaxed),
            queued,
            running: self.running.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let c = Counters::default();
        Counters::bump(&c.submitted);
        Counters::bump(&c.submitted);
        Counters::add(&c.discarded, 3);
        c.running.fetch_add(2, Ordering::Relaxed);

        let counts = c.snapshot(1);
        assert_eq!(counts.submitted, 2);
        assert_eq!(counts.discarded, 3);
        assert_eq!(counts.running, 2);
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.completed, 0);
    }

    #[test]
    fn counts_serialize_as_flat_json() {
        let counts = QueueCounts {
            submitted: 5,
            completed: 4,
            discarded: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["submitted"], 5);
        assert_eq!(json["completed"], 4);
        assert_eq!(json["discarded"], 1);
        assert_eq!(json["panicked"], 0);
    }
}
