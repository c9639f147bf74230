//! Bounded worker pool shared by every component that submits work.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;

/// Owns a runtime built by [`WorkerPool::new`].
///
/// Shut down in the background so dropping the last pool handle is safe
/// from any thread, async or not.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// A fixed-size pool of worker tasks.
///
/// Construct one at startup and hand clones to whatever needs to run
/// background work. At most `workers` submitted jobs execute at a time;
/// the rest queue on a semaphore without blocking the submitter.
#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    workers: usize,
    _runtime: Option<Arc<OwnedRuntime>>,
}

impl WorkerPool {
    /// Start a dedicated multi-threaded runtime with `workers` threads.
    pub fn new(workers: usize) -> io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("stashly-worker")
            .enable_all()
            .build()?;

        tracing::info!(workers, "worker pool started");

        Ok(Self {
            handle: runtime.handle().clone(),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Run jobs on an existing runtime, still capped at `workers` at a time.
    pub fn from_handle(handle: Handle, workers: usize) -> Self {
        let workers = workers.max(1);
        Self { handle, permits: Arc::new(Semaphore::new(workers)), workers, _runtime: None }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs currently executing.
    pub fn busy(&self) -> usize {
        self.workers - self.permits.available_permits()
    }

    /// Queue `job`; it starts once a worker slot is free.
    pub fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        });
    }
}
