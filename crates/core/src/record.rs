//! Preview record and bookmark types.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Normalized link preview for a single URL.
///
/// Stored verbatim as the cache entry's metadata file. `thumbnail` and
/// `favicon` hold URLs or are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub favicon: String,
}

impl PreviewRecord {
    /// The record handed out when a preview cannot be produced.
    pub fn degraded(url: &str) -> Self {
        Self { title: url.to_string(), ..Default::default() }
    }

    /// Restore the non-empty title invariant after loading from disk.
    pub fn with_title_fallback(mut self, url: &str) -> Self {
        if self.title.trim().is_empty() {
            self.title = url.to_string();
        }
        self
    }

    /// Whether this is exactly the degraded record for `url`.
    pub fn is_degraded(&self, url: &str) -> bool {
        *self == Self::degraded(url)
    }
}

/// A saved bookmark as stored in the application's data file.
///
/// The preview pipeline only reads `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
}

/// Read the bookmark list from the application's data file.
///
/// A missing file is an empty list; entries with a blank `url` are dropped.
pub async fn load_bookmarks(path: &Path) -> Result<Vec<BookmarkEntry>, Error> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::persistence(path, e)),
    };
    let entries: Vec<BookmarkEntry> = serde_json::from_slice(&bytes)?;
    Ok(entries.into_iter().filter(|e| !e.url.trim().is_empty()).collect())
}
