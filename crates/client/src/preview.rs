//! Read-through preview fetcher.
//!
//! A cache hit costs one small file read and no network access. On a miss
//! the page is fetched, scraped, and the record persisted before it is
//! returned. Failures never escape: the caller always gets a record, at
//! worst the degraded one whose title is the URL itself. Nothing is created
//! on disk for a URL until a record is actually written.

use std::path::Path;
use std::sync::Arc;

use stashly_core::{AssetKind, CacheLocator, Error, PreviewRecord};

use crate::extract::extract_preview;
use crate::fetch::{HttpSource, Resource, canonicalize, decode_html};

/// Produces [`PreviewRecord`]s, consulting the on-disk cache first.
pub struct PreviewFetcher {
    source: Arc<dyn HttpSource>,
    cache: CacheLocator,
}

impl PreviewFetcher {
    pub fn new(source: Arc<dyn HttpSource>, cache: CacheLocator) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &CacheLocator {
        &self.cache
    }

    /// Preview for `url`, served from cache when present.
    pub async fn fetch(&self, url: &str) -> PreviewRecord {
        self.fetch_with(url, true).await
    }

    /// Preview for `url`, ignoring any cached record and overwriting it.
    pub async fn refresh(&self, url: &str) -> PreviewRecord {
        self.fetch_with(url, false).await
    }

    async fn fetch_with(&self, url: &str, use_cache: bool) -> PreviewRecord {
        let dir = self.cache.path_for(url);

        if use_cache && let Some(record) = self.cached(url, &dir).await {
            return record;
        }

        let record = match self.scrape(url).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(url, network = e.is_network(), "preview fetch failed: {}", e);
                return PreviewRecord::degraded(url);
            }
        };

        if let Err(e) = self.store(url, &record).await {
            tracing::warn!(url, "failed to persist preview: {}", e);
        }

        record
    }

    async fn cached(&self, url: &str, dir: &Path) -> Option<PreviewRecord> {
        match CacheLocator::read_record(dir).await {
            Ok(Some(record)) => {
                tracing::debug!("cache hit for {}", url);
                Some(record.with_title_fallback(url))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url, "ignoring unreadable cached preview: {}", e);
                None
            }
        }
    }

    /// Write the record, dropping persisted images whose source URL changed.
    async fn store(&self, url: &str, record: &PreviewRecord) -> Result<(), Error> {
        let dir = self.cache.locate(url).await?;
        let previous = CacheLocator::read_record(&dir).await.ok().flatten();

        CacheLocator::write_record(&dir, record).await?;

        for kind in [AssetKind::Thumbnail, AssetKind::Favicon] {
            let unchanged = previous.as_ref().is_some_and(|p| kind.source_url(p) == kind.source_url(record));
            if !unchanged && CacheLocator::clear_asset(&dir, kind).await? > 0 {
                tracing::debug!(url, %kind, "dropped stale cached image");
            }
        }

        Ok(())
    }

    async fn scrape(&self, url: &str) -> Result<PreviewRecord, Error> {
        let page_url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.source.get(&page_url, Resource::Page).await?;
        let html = decode_html(&response.bytes, response.content_type.as_deref());
        Ok(extract_preview(&html, url, &response.final_url))
    }
}
