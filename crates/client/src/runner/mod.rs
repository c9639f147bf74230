//! Background execution of preview and image work.
//!
//! ### Submission
//! - `submit_*` never blocks; each returns a [`Ticket`] the consumer polls,
//!   waits on, or awaits.
//! - Jobs run on an injected [`WorkerPool`]; there is no process-global pool.
//!
//! ### In-flight de-duplication
//! - Concurrent `submit_preview` calls for the same URL share one fetch and
//!   the record fans out to every ticket.
//! - The in-flight entry is cleared when the job finishes or unwinds, so a
//!   lost job never blocks later submissions for that URL.
//!
//! No ordering holds between different URLs, and nothing is cancelled: a
//! ticket nobody reads any more just drops its result.

pub mod pool;
pub mod ticket;

pub use pool::WorkerPool;
pub use ticket::Ticket;

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use stashly_core::{AppConfig, CacheLocator, Error, PreviewRecord};
use tokio::sync::oneshot;

use crate::fetch::{FetchClient, FetchConfig, HttpSource};
use crate::images::{ImageMaterializer, PreviewImages};
use crate::preview::PreviewFetcher;

type Waiters = Arc<Mutex<HashMap<String, Vec<oneshot::Sender<PreviewRecord>>>>>;

/// Clears a URL's in-flight entry, delivering the record if one was produced.
struct InFlightGuard {
    waiters: Waiters,
    url: String,
    completed: bool,
}

impl InFlightGuard {
    fn complete(mut self, record: PreviewRecord) {
        let senders = self.waiters.lock().remove(&self.url).unwrap_or_default();
        self.completed = true;
        for tx in senders {
            let _ = tx.send(record.clone());
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(url = %self.url, "preview job ended without a result");
            self.waiters.lock().remove(&self.url);
        }
    }
}

/// Front door for consumers: submit a URL, get a ticket back.
#[derive(Clone)]
pub struct TaskRunner {
    pool: WorkerPool,
    fetcher: Arc<PreviewFetcher>,
    materializer: Arc<ImageMaterializer>,
    in_flight: Waiters,
}

impl TaskRunner {
    pub fn new(pool: WorkerPool, fetcher: Arc<PreviewFetcher>, materializer: Arc<ImageMaterializer>) -> Self {
        Self { pool, fetcher, materializer, in_flight: Arc::default() }
    }

    /// Wire a runner over one shared reqwest client and the configured cache root.
    pub fn from_config(pool: WorkerPool, config: &AppConfig) -> Result<Self, Error> {
        let source: Arc<dyn HttpSource> = Arc::new(FetchClient::new(FetchConfig::from(config))?);
        let cache = CacheLocator::new(&config.cache_dir);
        let fetcher = Arc::new(PreviewFetcher::new(source.clone(), cache));
        let materializer = Arc::new(ImageMaterializer::new(source));
        Ok(Self::new(pool, fetcher, materializer))
    }

    pub fn cache(&self) -> &CacheLocator {
        self.fetcher.cache()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// URLs with a preview fetch currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Fetch (or load from cache) the preview for `url` in the background.
    pub fn submit_preview(&self, url: impl Into<String>) -> Ticket<PreviewRecord> {
        let url = url.into();
        let (tx, rx) = oneshot::channel();

        {
            let mut in_flight = self.in_flight.lock();
            if let Some(waiters) = in_flight.get_mut(&url) {
                tracing::debug!(url, "joining in-flight preview fetch");
                waiters.push(tx);
                return Ticket::new(rx);
            }
            in_flight.insert(url.clone(), vec![tx]);
        }

        tracing::debug!(url, busy = self.pool.busy(), "queueing preview fetch");
        let guard = InFlightGuard { waiters: self.in_flight.clone(), url, completed: false };
        let fetcher = self.fetcher.clone();
        self.pool.spawn(async move {
            let record = fetcher.fetch(&guard.url).await;
            guard.complete(record);
        });

        Ticket::new(rx)
    }

    /// Fetch the preview for `url` bypassing the cache. Not de-duplicated.
    pub fn submit_refresh(&self, url: impl Into<String>) -> Ticket<PreviewRecord> {
        let url = url.into();
        let fetcher = self.fetcher.clone();
        self.run(async move { fetcher.refresh(&url).await })
    }

    /// Materialize the images of `url`'s cache entry in the background.
    pub fn submit_images(&self, url: impl Into<String>) -> Ticket<PreviewImages> {
        let dir = self.cache().path_for(&url.into());
        self.submit_image_load(dir)
    }

    /// Materialize the images stored in a cache directory in the background.
    pub fn submit_image_load(&self, dir: PathBuf) -> Ticket<PreviewImages> {
        let materializer = self.materializer.clone();
        self.run(async move { materializer.load_images(&dir).await })
    }

    fn run<T, F>(&self, job: F) -> Ticket<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(async move {
            let _ = tx.send(job.await);
        });
        Ticket::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchResponse, Resource};
    use crate::testing::{FakeSource, png_bytes};
    use async_trait::async_trait;
    use reqwest::Url;
    use std::task::Poll;
    use std::time::Duration;
    use tempfile::TempDir;

    fn runner(source: Arc<dyn HttpSource>, tmp: &TempDir, workers: usize) -> TaskRunner {
        let cache = CacheLocator::new(tmp.path());
        let fetcher = Arc::new(PreviewFetcher::new(source.clone(), cache));
        let materializer = Arc::new(ImageMaterializer::new(source));
        TaskRunner::new(WorkerPool::new(workers).unwrap(), fetcher, materializer)
    }

    fn page(title: &str) -> String {
        format!("<html><head><title>{title}</title></head></html>")
    }

    #[test]
    fn test_fifty_distinct_urls() {
        let tmp = TempDir::new().unwrap();
        let mut source = FakeSource::new().delay(Duration::from_millis(5));
        for i in 0..50 {
            source = source.page(&format!("https://site{i}.example/"), &page(&format!("Page {i}")));
        }
        let runner = runner(Arc::new(source), &tmp, 4);

        let tickets: Vec<_> = (0..50)
            .map(|i| (i, runner.submit_preview(format!("https://site{i}.example/"))))
            .collect();

        for (i, ticket) in tickets {
            let record = ticket.wait().expect("job lost");
            assert_eq!(record.title, format!("Page {i}"));
            assert_eq!(record.favicon, format!("https://site{i}.example/favicon.ico"));
        }
        assert_eq!(runner.in_flight(), 0);
    }

    #[test]
    fn test_same_url_shares_one_fetch() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new().delay(Duration::from_millis(100)).page("https://a.com/", &page("A")));
        let runner = runner(source.clone(), &tmp, 4);

        let tickets: Vec<_> = (0..10).map(|_| runner.submit_preview("https://a.com/")).collect();
        assert_eq!(runner.in_flight(), 1);

        for ticket in tickets {
            assert_eq!(ticket.wait().unwrap().title, "A");
        }
        assert_eq!(source.requests_for("https://a.com/"), 1);
        assert_eq!(runner.in_flight(), 0);
    }

    #[test]
    fn test_resubmit_after_completion_hits_cache() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new().page("https://a.com/", &page("A")));
        let runner = runner(source.clone(), &tmp, 2);

        let first = runner.submit_preview("https://a.com/").wait().unwrap();
        let second = runner.submit_preview("https://a.com/").wait().unwrap();
        assert_eq!(first, second);
        assert_eq!(source.requests(), 1);
    }

    #[test]
    fn test_submission_does_not_block() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new().delay(Duration::from_millis(300)).page("https://a.com/", &page("A")));
        let runner = runner(source, &tmp, 1);

        let started = std::time::Instant::now();
        let mut ticket = runner.submit_preview("https://a.com/");
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(ticket.try_take().is_pending());

        loop {
            match ticket.try_take() {
                Poll::Ready(record) => {
                    assert_eq!(record.unwrap().title, "A");
                    break;
                }
                Poll::Pending => std::thread::sleep(Duration::from_millis(10)),
            }
        }
    }

    #[test]
    fn test_dropped_ticket_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new().delay(Duration::from_millis(20)).page("https://a.com/", &page("A")));
        let runner = runner(source, &tmp, 1);

        drop(runner.submit_preview("https://a.com/"));
        drop(runner.submit_images("https://a.com/"));

        let record = runner.submit_preview("https://a.com/").wait().unwrap();
        assert_eq!(record.title, "A");
    }

    #[test]
    fn test_images_ticket() {
        let tmp = TempDir::new().unwrap();
        let html = r#"<html><head><meta property="og:image" content="https://a.com/og.png"></head></html>"#;
        let source = Arc::new(
            FakeSource::new()
                .page("https://a.com/", html)
                .image("https://a.com/og.png", Some("image/png"), png_bytes(8, 8))
                .image("https://a.com/favicon.ico", Some("image/png"), png_bytes(2, 2)),
        );
        let runner = runner(source, &tmp, 2);

        runner.submit_preview("https://a.com/").wait().unwrap();
        let images = runner.submit_images("https://a.com/").wait().unwrap();
        assert!(images.thumbnail.is_some());
        assert!(images.favicon.is_some());
    }

    #[test]
    fn test_images_for_unknown_url_are_empty() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(Arc::new(FakeSource::new()), &tmp, 1);
        let images = runner.submit_images("https://never-fetched.example/").wait().unwrap();
        assert!(images.is_empty());
        assert!(!runner.cache().path_for("https://never-fetched.example/").exists());
    }

    #[test]
    fn test_refresh_refetches() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new().page("https://a.com/", &page("A")));
        let runner = runner(source.clone(), &tmp, 1);

        runner.submit_preview("https://a.com/").wait().unwrap();
        runner.submit_refresh("https://a.com/").wait().unwrap();
        assert_eq!(source.requests(), 2);
    }

    struct PanickingSource;

    #[async_trait]
    impl HttpSource for PanickingSource {
        async fn get(&self, _url: &Url, _resource: Resource) -> Result<FetchResponse, Error> {
            panic!("source exploded");
        }
    }

    #[test]
    fn test_panicking_job_releases_waiters() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(Arc::new(PanickingSource), &tmp, 1);

        assert_eq!(runner.submit_preview("https://a.com/").wait(), None);
        assert_eq!(runner.in_flight(), 0);
        assert_eq!(runner.submit_preview("https://a.com/").wait(), None);
    }

    #[test]
    fn test_from_config() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig { cache_dir: tmp.path().join("cache"), workers: 2, ..Default::default() };
        let pool = WorkerPool::new(config.workers).unwrap();
        let runner = TaskRunner::from_config(pool, &config).unwrap();
        assert_eq!(runner.cache().root(), tmp.path().join("cache"));
        assert_eq!(runner.pool().workers(), 2);
    }
}
