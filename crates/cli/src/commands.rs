//! Subcommand implementations.
//!
//! Everything goes through the [`TaskRunner`]: URLs are submitted up front
//! and results are printed in completion order.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use stashly_client::{PreviewImages, TaskRunner};
use stashly_core::{PreviewRecord, load_bookmarks};
use tokio::task::JoinSet;

#[derive(Serialize)]
struct PreviewLine<'a> {
    url: &'a str,
    #[serde(flatten)]
    record: &'a PreviewRecord,
}

/// Totals reported by [`warm`].
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct WarmSummary {
    pub bookmarks: usize,
    pub degraded: usize,
    pub thumbnails: usize,
    pub favicons: usize,
}

pub async fn fetch(runner: &TaskRunner, urls: Vec<String>, refresh: bool, out: &mut impl Write) -> Result<()> {
    let mut pending = JoinSet::new();
    for url in urls {
        let ticket = if refresh { runner.submit_refresh(url.clone()) } else { runner.submit_preview(url.clone()) };
        pending.spawn(async move { (ticket.recv().await, url) });
    }

    while let Some(joined) = pending.join_next().await {
        let (record, url) = joined?;
        let record = record.unwrap_or_else(|| PreviewRecord::degraded(&url));
        let line = serde_json::to_string(&PreviewLine { url: &url, record: &record })?;
        writeln!(out, "{}", line)?;
    }

    Ok(())
}

pub async fn images(runner: &TaskRunner, url: String, out: &mut impl Write) -> Result<()> {
    runner.submit_preview(url.clone()).recv().await;
    let images = runner.submit_images(url).recv().await.unwrap_or_default();

    if images.is_empty() {
        writeln!(out, "empty")?;
        return Ok(());
    }

    for (name, image) in [("thumbnail", &images.thumbnail), ("favicon", &images.favicon)] {
        match image {
            Some(image) => writeln!(out, "{}: {}x{}", name, image.width(), image.height())?,
            None => writeln!(out, "{}: empty", name)?,
        }
    }

    Ok(())
}

pub async fn warm(runner: &TaskRunner, data_file: &Path) -> Result<WarmSummary> {
    let bookmarks = load_bookmarks(data_file)
        .await
        .with_context(|| format!("failed to read bookmarks from {}", data_file.display()))?;

    tracing::info!(count = bookmarks.len(), "warming preview cache");

    let mut pending = JoinSet::new();
    for entry in bookmarks {
        let runner = runner.clone();
        pending.spawn(async move {
            let record = runner.submit_preview(entry.url.clone()).recv().await;
            let images = runner.submit_images(entry.url.clone()).recv().await;
            (entry.url, record, images)
        });
    }

    let mut summary = WarmSummary::default();
    while let Some(joined) = pending.join_next().await {
        let (url, record, images): (String, Option<PreviewRecord>, Option<PreviewImages>) = joined?;
        summary.bookmarks += 1;
        if record.is_none_or(|r| r.is_degraded(&url)) {
            summary.degraded += 1;
        }
        if let Some(images) = images {
            summary.thumbnails += usize::from(images.thumbnail.is_some());
            summary.favicons += usize::from(images.favicon.is_some());
        }
    }

    Ok(summary)
}

pub async fn remove(runner: &TaskRunner, urls: Vec<String>, out: &mut impl Write) -> Result<()> {
    for url in urls {
        let removed = runner.cache().remove(&url).await?;
        let status = if removed { "removed" } else { "not cached" };
        writeln!(out, "{}: {}", status, url)?;
    }
    Ok(())
}
