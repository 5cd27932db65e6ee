use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use spindle_core::WorkItem;

/// Demo job: Collatz stopping time of `start`, after an artificial delay.
#[derive(Debug)]
pub struct CollatzJob {
    pub id: u64,
    pub start: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub id: u64,
    pub start: u64,
    pub steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// `None` when the failure comes from a panic and the job is unknown.
    pub id: Option<u64>,
    pub reason: String,
}

pub type JobResult = Result<JobReport, JobFailure>;

#[async_trait]
impl WorkItem for CollatzJob {
    type Output = JobResult;

    async fn run(self: Box<Self>) -> JobResult {
        tokio::time::sleep(self.delay).await;
        match collatz_steps(self.start) {
            Ok(steps) => Ok(JobReport {
                id: self.id,
                start: self.start,
                steps,
            }),
            Err(reason) => Err(JobFailure {
                id: Some(self.id),
                reason,
            }),
        }
    }
}

pub fn collatz_steps(start: u64) -> Result<u32, String> {
    if start == 0 {
        return Err("0 has no collatz sequence".to_string());
    }

    let mut n = start;
    let mut steps = 0u32;
    while n != 1 {
        n = if n % 2 == 0 {
            n / 2
        } else {
            n.checked_mul(3)
                .and_then(|v| v.checked_add(1))
                .ok_or_else(|| format!("overflow after {steps} steps"))?
        };
        steps += 1;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::WorkQueue;

    #[test]
    fn known_stopping_times() {
        assert_eq!(collatz_steps(1), Ok(0));
        assert_eq!(collatz_steps(6), Ok(8));
        assert_eq!(collatz_steps(27), Ok(111));
    }

    #[test]
    fn zero_is_rejected() {
        assert!(collatz_steps(0).is_err());
    }

    #[test]
    fn overflow_is_reported() {
        let err = collatz_steps(u64::MAX).unwrap_err();
        assert!(err.contains("overflow"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn jobs_flow_through_queue() {
        let queue = WorkQueue::<JobResult>::new(4, 4);
        queue.start(2).unwrap();
        for (id, start) in [(0, 6), (1, 0), (2, 27)] {
            queue
                .add_work(CollatzJob {
                    id,
                    start,
                    delay: Duration::from_millis(5),
                })
                .await;
        }
        queue.finish();

        let mut results = queue.results().collect_all().await;
        results.sort_by_key(|r| match r {
            Ok(report) => report.id,
            Err(failure) => failure.id.unwrap_or(u64::MAX),
        });
        assert_eq!(
            results[0],
            Ok(JobReport {
                id: 0,
                start: 6,
                steps: 8
            })
        );
        assert!(matches!(&results[1], Err(JobFailure { id: Some(1), .. })));
        assert!(matches!(&results[2], Ok(JobReport { steps: 111, .. })));
    }
}
