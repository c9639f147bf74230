//! Cache directory resolution and file access.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use super::hash::cache_key;
use crate::{Error, PreviewRecord};

/// Name of the serialized preview record inside an entry directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Extension of the marker recording a source URL whose bytes do not decode.
pub const UNDECODABLE_EXT: &str = "undecodable";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Binary assets stored next to the metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Thumbnail,
    Favicon,
}

impl AssetKind {
    /// File stem used on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Thumbnail => "thumbnail",
            AssetKind::Favicon => "favicon",
        }
    }

    /// The record field holding this asset's source URL.
    pub fn source_url(self, record: &PreviewRecord) -> &str {
        match self {
            AssetKind::Thumbnail => &record.thumbnail,
            AssetKind::Favicon => &record.favicon,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps URLs to their cache directories under a fixed root.
#[derive(Debug, Clone)]
pub struct CacheLocator {
    root: PathBuf,
}

impl CacheLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name for `url`.
    pub fn key(url: &str) -> String {
        cache_key(url)
    }

    /// Directory for `url`, without touching the filesystem.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(Self::key(url))
    }

    /// Directory for `url`, created if absent.
    pub async fn locate(&self, url: &str) -> Result<PathBuf, Error> {
        let dir = self.path_for(url);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::persistence(&dir, e))?;
        Ok(dir)
    }

    /// Delete the entry for `url`. Returns whether anything was removed.
    pub async fn remove(&self, url: &str) -> Result<bool, Error> {
        let dir = self.path_for(url);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(url, dir = %dir.display(), "removed cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::persistence(dir, e)),
        }
    }

    /// Load the metadata file from an entry directory.
    ///
    /// Returns `Ok(None)` when the entry has no metadata yet.
    pub async fn read_record(dir: &Path) -> Result<Option<PreviewRecord>, Error> {
        let path = dir.join(METADATA_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(path, e)),
        };
        let record = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }

    /// Store the metadata file, replacing any previous one atomically.
    pub async fn write_record(dir: &Path, record: &PreviewRecord) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&dir.join(METADATA_FILE), &json).await
    }

    /// Find a persisted asset (`<kind>.<ext>`) in an entry directory.
    ///
    /// When several extensions exist the lexicographically first wins.
    pub async fn find_asset(dir: &Path, kind: AssetKind) -> Result<Option<PathBuf>, Error> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(dir, e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::persistence(dir, e))? {
            let path = entry.path();
            let is_match = path.file_stem().and_then(|s| s.to_str()) == Some(kind.as_str())
                && path.extension().is_some_and(|ext| !ext.is_empty() && ext != UNDECODABLE_EXT);
            if is_match {
                found.push(path);
            }
        }

        found.sort();
        Ok(found.into_iter().next())
    }

    /// Store raw asset bytes as `<kind>.<ext>` and return the path.
    pub async fn write_asset(dir: &Path, kind: AssetKind, ext: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
        let path = dir.join(format!("{}.{}", kind.as_str(), ext));
        write_atomic(&path, bytes).await?;
        Ok(path)
    }

    /// Remember that `source_url` yields bytes that cannot be decoded.
    pub async fn mark_undecodable(dir: &Path, kind: AssetKind, source_url: &str) -> Result<(), Error> {
        write_atomic(&marker_path(dir, kind), source_url.as_bytes()).await
    }

    /// Whether `source_url` was previously marked undecodable for `kind`.
    pub async fn is_marked_undecodable(dir: &Path, kind: AssetKind, source_url: &str) -> bool {
        match fs::read(marker_path(dir, kind)).await {
            Ok(bytes) => bytes == source_url.as_bytes(),
            Err(_) => false,
        }
    }

    /// Delete every persisted file of `kind`, marker included.
    ///
    /// Returns how many files were removed.
    pub async fn clear_asset(dir: &Path, kind: AssetKind) -> Result<usize, Error> {
        let mut removed = 0;
        while let Some(path) = Self::find_asset(dir, kind).await? {
            fs::remove_file(&path).await.map_err(|e| Error::persistence(&path, e))?;
            removed += 1;
        }
        match fs::remove_file(marker_path(dir, kind)).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::persistence(marker_path(dir, kind), e)),
        }
        Ok(removed)
    }
}

fn marker_path(dir: &Path, kind: AssetKind) -> PathBuf {
    dir.join(format!("{}.{}", kind.as_str(), UNDECODABLE_EXT))
}

/// Write through a unique temp file in the same directory, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
    let tmp = dir.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = fs::write(&tmp, bytes).await {
        return Err(Error::persistence(tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(Error::persistence(path, e));
    }
    Ok(())
}
