use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

/// A unit of scheduled work, per §4.6/§4.7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    FetchAdapter(String),
    ProcessingSweep,
}

impl Job {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            // Fetch jobs: up to 3 retries, 120s base, per §4.7.
            Job::FetchAdapter(_) => RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_secs(120),
            },
            // Processing sweep: up to 2 retries, 30s base, per §4.7.
            Job::ProcessingSweep => RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_secs(30),
            },
        }
    }

    fn label(&self) -> String {
        match self {
            Job::FetchAdapter(name) => format!("fetch:{name}"),
            Job::ProcessingSweep => "sweep".to_string(),
        }
    }
}

struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

/// Executes a [`Job`]'s body. Implemented by the pipeline crate's glue code
/// binding adapters, the raw store, and the graph writer together.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> anyhow::Result<()>;
}

/// Bounded-concurrency worker pool with at-least-once delivery and
/// acknowledge-after-success semantics, per §4.7.
///
/// The dispatcher is modeled directly over an in-process bounded pool
/// rather than an external broker: the contract (bounded concurrency,
/// at-least-once, ack-after-success, per-job retry/backoff) does not
/// require one, per §4.7's "pluggable collaborator" framing.
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<(Job, u32)>,
}

impl Dispatcher {
    /// Spawn the dispatch loop. `concurrency` bounds how many jobs may run
    /// at once; a job is only acknowledged (dropped from in-flight tracking)
    /// once its body returns without error.
    pub fn spawn(concurrency: usize, runner: Arc<dyn JobRunner>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Job, u32)>();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let dispatcher = Arc::new(Self { tx });

        let loop_tx = dispatcher.tx.clone();
        tokio::spawn(async move {
            while let Some((job, attempt)) = rx.recv().await {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                let runner = runner.clone();
                let retry_tx = loop_tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let label = job.label();
                    match runner.run(&job).await {
                        Ok(()) => info!(job = %label, attempt, "job completed"),
                        Err(e) => {
                            let policy = job.retry_policy();
                            if attempt < policy.max_retries {
                                let delay = policy.base_delay * (attempt + 1);
                                warn!(job = %label, attempt, error = %e, delay_secs = delay.as_secs(), "job failed, retrying");
                                tokio::spawn(async move {
                                    tokio::time::sleep(delay).await;
                                    let _ = retry_tx.send((job, attempt + 1));
                                });
                            } else {
                                error!(job = %label, attempt, error = %e, "job exhausted retries, dropping");
                            }
                        }
                    }
                });
            }
        });

        dispatcher
    }

    /// Enqueue a job for first-attempt execution.
    pub fn enqueue(&self, job: Job) {
        let _ = self.tx.send((job, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    struct CountingRunner {
        calls: Arc<AtomicU32>,
        fail_times: u32,
    }

    #[async_trait]
    impl JobRunner for CountingRunner {
        async fn run(&self, _job: &Job) -> anyhow::Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                anyhow::bail!("synthetic failure");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_retries_until_success_within_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let runner = Arc::new(CountingRunner {
            calls: calls.clone(),
            fail_times: 1,
        });
        let dispatcher = Dispatcher::spawn(2, runner);
        dispatcher.enqueue(Job::ProcessingSweep);

        tokio::time::advance(StdDuration::from_secs(31)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn retry_policy_matches_fetch_and_sweep_budgets() {
        let fetch = Job::FetchAdapter("feed".to_string()).retry_policy();
        assert_eq!(fetch.max_retries, 3);
        assert_eq!(fetch.base_delay, Duration::from_secs(120));

        let sweep = Job::ProcessingSweep.retry_policy();
        assert_eq!(sweep.max_retries, 2);
        assert_eq!(sweep.base_delay, Duration::from_secs(30));
    }
}
