// Bounded worker pool that keeps blocking inference off the async runtime

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to create worker pool: {0}")]
    Build(String),

    #[error("Inference worker panicked")]
    WorkerPanicked,

    #[error("Worker pool dropped the job")]
    Closed,
}

/// Fixed-size pool of OS threads for model inference
pub struct InferenceExecutor {
    pool: ThreadPool,
    workers: usize,
}

impl InferenceExecutor {
    pub fn new(workers: usize) -> Result<Self, ExecutorError> {
        if workers == 0 {
            return Err(ExecutorError::Build("worker count must be non-zero".to_string()));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("framewatch-infer-{}", i))
            .build()
            .map_err(|e| ExecutorError::Build(e.to_string()))?;

        info!("Inference pool ready with {} workers", workers);
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` on the pool and await its result without blocking the caller's thread
    pub async fn run<F, R>(&self, job: F) -> Result<R, ExecutorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            // Receiver is gone if the connection closed mid-inference
            let _ = tx.send(result);
        });

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => {
                error!("Inference job panicked");
                Err(ExecutorError::WorkerPanicked)
            }
            Err(_) => Err(ExecutorError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_value() {
        let executor = InferenceExecutor::new(2).unwrap();
        let value = executor.run(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_runs_on_named_worker_threads() {
        let executor = InferenceExecutor::new(1).unwrap();
        let name = executor
            .run(|| std::thread::current().name().map(str::to_string))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("framewatch-infer-0"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let executor = InferenceExecutor::new(1).unwrap();
        let result: Result<(), _> = executor.run(|| panic!("model exploded")).await;
        assert!(matches!(result, Err(ExecutorError::WorkerPanicked)));

        // Pool keeps serving after a panic
        assert_eq!(executor.run(|| 7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = Arc::new(InferenceExecutor::new(2).unwrap());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..8)
            .map(|_| {
                let executor = executor.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    executor
                        .run(move || {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            running.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();

        for job in jobs {
            job.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(InferenceExecutor::new(0), Err(ExecutorError::Build(_))));
    }
}
