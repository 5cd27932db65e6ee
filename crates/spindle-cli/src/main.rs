mod job;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spindle_core::{QueueConfig, QueueCounts, WorkQueueBuilder};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::job::{CollatzJob, JobFailure, JobResult};

/// Push simulated Collatz jobs through a spindle work queue and print the
/// results as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "spindle", version)]
struct Args {
    /// JSON file with `intake_capacity`, `result_capacity` and `executors`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of jobs to submit.
    #[arg(long, default_value_t = 20)]
    items: u64,

    /// Overrides `executors` from the config.
    #[arg(long)]
    executors: Option<usize>,

    /// Overrides `intake_capacity` from the config.
    #[arg(long)]
    intake: Option<usize>,

    /// Overrides `result_capacity` from the config.
    #[arg(long)]
    results: Option<usize>,

    /// Upper bound of the random per-job delay.
    #[arg(long, default_value_t = 50)]
    max_delay_ms: u64,

    /// Abort the queue once this many results were printed.
    #[arg(long)]
    abort_after: Option<usize>,

    /// Seed for reproducible job inputs.
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn queue_config(&self) -> anyhow::Result<QueueConfig> {
        let mut config = match &self.config {
            Some(path) => QueueConfig::from_json_file(path)?,
            None => QueueConfig::default(),
        };
        if let Some(n) = self.executors {
            config.executors = n;
        }
        if let Some(n) = self.intake {
            config.intake_capacity = n;
        }
        if let Some(n) = self.results {
            config.result_capacity = n;
        }
        Ok(config)
    }
}

fn make_jobs(args: &Args) -> Vec<CollatzJob> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..args.items)
        .map(|id| CollatzJob {
            id,
            start: rng.gen_range(0..10_000),
            delay: Duration::from_millis(rng.gen_range(0..=args.max_delay_ms)),
        })
        .collect()
}

async fn run(args: Args) -> anyhow::Result<QueueCounts> {
    let config = args.queue_config()?;
    let queue = WorkQueueBuilder::<JobResult>::from_config(&config)
        .on_panic(|panic| {
            Err(JobFailure {
                id: None,
                reason: panic.to_string(),
            })
        })
        .build();

    queue
        .start(config.executors)
        .context("failed to start executors")?;
    info!(?config, items = args.items, "spindle started");

    if args.abort_after == Some(0) {
        queue.abort();
    }

    // producer: 全 job を投入してから finish
    let jobs = make_jobs(&args);
    let producer = tokio::spawn({
        let queue = queue.clone();
        async move {
            for job in jobs {
                queue.add_work(job).await;
            }
            queue.finish();
        }
    });

    let results = queue.results();
    let mut printed = 0usize;
    while let Some(result) = results.recv().await {
        println!("{}", serde_json::to_string(&result)?);
        printed += 1;
        if args.abort_after == Some(printed) {
            warn!(printed, "abort requested; remaining jobs are dropped");
            queue.abort();
        }
    }

    producer.await.context("producer task failed")?;
    let counts = queue.counts();
    info!(?counts, "spindle finished");
    println!("{}", serde_json::to_string(&counts)?);
    Ok(counts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_default_config() {
        let args = Args::parse_from(["spindle", "--executors", "2", "--intake", "0"]);
        let config = args.queue_config().unwrap();
        assert_eq!(config.executors, 2);
        assert_eq!(config.intake_capacity, 0);
        assert_eq!(config.result_capacity, QueueConfig::default().result_capacity);
    }

    #[test]
    fn seeded_jobs_are_reproducible() {
        let args = Args::parse_from(["spindle", "--items", "5", "--seed", "7"]);
        let a: Vec<u64> = make_jobs(&args).iter().map(|j| j.start).collect();
        let b: Vec<u64> = make_jobs(&args).iter().map(|j| j.start).collect();
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_completes_with_abort() {
        let args = Args::parse_from([
            "spindle",
            "--items",
            "30",
            "--executors",
            "2",
            "--results",
            "0",
            "--max-delay-ms",
            "20",
            "--abort-after",
            "3",
            "--seed",
            "1",
        ]);
        let counts = run(args).await.unwrap();

        // at most one in-flight result per executor gets past the abort
        assert!(counts.completed <= 3 + 2, "{counts:?}");
        assert!(counts.discarded > 0, "{counts:?}");
        assert_eq!(counts.running, 0);
        assert_eq!(counts.submitted, 30);
    }
}
