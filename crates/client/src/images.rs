//! Thumbnail and favicon materialization.
//!
//! Images live next to the preview record as `thumbnail.<ext>` and
//! `favicon.<ext>`. A persisted file that decodes is used as-is; otherwise
//! the URL stored in the record is downloaded, persisted, and decoded. The
//! two slots are handled independently and concurrently, and any failure
//! just leaves its slot empty. A download that does not decode (SVG, for
//! one) is marked so later loads return empty without a request until the
//! record points somewhere else.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use stashly_core::{AssetKind, CacheLocator, Error, PreviewRecord};
use tokio::fs;
use url::Url;

use crate::fetch::{HttpSource, Resource, parse_asset_url};

/// Decoded preview images; `None` is the empty sentinel.
#[derive(Debug, Default)]
pub struct PreviewImages {
    pub thumbnail: Option<DynamicImage>,
    pub favicon: Option<DynamicImage>,
}

impl PreviewImages {
    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none() && self.favicon.is_none()
    }
}

/// Loads and caches the binary assets referenced by a preview record.
pub struct ImageMaterializer {
    source: Arc<dyn HttpSource>,
}

impl ImageMaterializer {
    pub fn new(source: Arc<dyn HttpSource>) -> Self {
        Self { source }
    }

    /// Both images for the cache entry in `dir`. Never fails.
    pub async fn load_images(&self, dir: &Path) -> PreviewImages {
        let record = match CacheLocator::read_record(dir).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "unreadable preview metadata: {}", e);
                None
            }
        };

        let (thumbnail, favicon) = tokio::join!(
            self.load_slot(dir, AssetKind::Thumbnail, record.as_ref()),
            self.load_slot(dir, AssetKind::Favicon, record.as_ref()),
        );

        PreviewImages { thumbnail, favicon }
    }

    async fn load_slot(&self, dir: &Path, kind: AssetKind, record: Option<&PreviewRecord>) -> Option<DynamicImage> {
        let source_url = record.map(|r| kind.source_url(r).trim()).unwrap_or_default();

        if !source_url.is_empty() && CacheLocator::is_marked_undecodable(dir, kind, source_url).await {
            tracing::debug!(%kind, url = source_url, "skipping known undecodable image");
            return None;
        }

        if let Some(image) = self.load_persisted(dir, kind).await {
            return Some(image);
        }

        if source_url.is_empty() {
            return None;
        }

        match self.download(dir, kind, source_url).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(%kind, url = source_url, network = e.is_network(), "image unavailable: {}", e);
                None
            }
        }
    }

    async fn load_persisted(&self, dir: &Path, kind: AssetKind) -> Option<DynamicImage> {
        let path = match CacheLocator::find_asset(dir, kind).await {
            Ok(path) => path?,
            Err(e) => {
                tracing::warn!(%kind, "cannot scan cache entry: {}", e);
                return None;
            }
        };

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read cached image: {}", e);
                return None;
            }
        };

        match decode(Bytes::from(bytes)).await {
            Ok(image) => {
                tracing::debug!(path = %path.display(), "cached {} decoded", kind);
                Some(image)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "discarding undecodable cached image: {}", e);
                // A corrupt file would otherwise shadow the re-download.
                let _ = fs::remove_file(&path).await;
                None
            }
        }
    }

    async fn download(&self, dir: &Path, kind: AssetKind, source_url: &str) -> Result<DynamicImage, Error> {
        let url = parse_asset_url(source_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.source.get(&url, Resource::Image).await?;

        let ext = sniff_extension(&response.bytes, response.content_type.as_deref(), &url);
        if let Err(e) = CacheLocator::write_asset(dir, kind, ext, &response.bytes).await {
            tracing::warn!(%kind, "failed to persist image: {}", e);
        }

        let decoded = decode(response.bytes).await;
        if decoded.is_err()
            && let Err(e) = CacheLocator::mark_undecodable(dir, kind, source_url).await
        {
            tracing::warn!(%kind, "failed to record undecodable image: {}", e);
        }
        decoded
    }
}

async fn decode(bytes: Bytes) -> Result<DynamicImage, Error> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| Error::Decode(format!("decode task failed: {}", e)))?
        .map_err(|e| Error::Decode(e.to_string()))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_ascii_lowercase();
    head.contains("<svg")
}

/// File extension for downloaded image bytes.
///
/// Magic bytes win, then the `Content-Type`, then the URL path; `img` when
/// nothing matches.
pub fn sniff_extension(bytes: &[u8], content_type: Option<&str>, source_url: &Url) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "jpg";
    }
    if bytes.starts_with(b"GIF8") {
        return "gif";
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "webp";
    }
    if bytes.len() >= 4 && bytes[0] == 0 && bytes[1] == 0 && (bytes[2] == 1 || bytes[2] == 2) && bytes[3] == 0 {
        return "ico";
    }
    if bytes.starts_with(b"BM") {
        return "bmp";
    }
    if looks_like_svg(bytes) {
        return "svg";
    }

    let content_type = content_type.map(|v| v.to_ascii_lowercase()).unwrap_or_default();
    let by_type = [
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
        ("image/gif", "gif"),
        ("image/webp", "webp"),
        ("image/x-icon", "ico"),
        ("vnd.microsoft.icon", "ico"),
        ("image/bmp", "bmp"),
        ("image/svg", "svg"),
    ];
    if let Some((_, ext)) = by_type.iter().find(|(mime, _)| content_type.contains(mime)) {
        return *ext;
    }

    let path_ext = source_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| Path::new(segment).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match path_ext.as_deref() {
        Some("png") => "png",
        Some("jpg" | "jpeg") => "jpg",
        Some("gif") => "gif",
        Some("webp") => "webp",
        Some("ico") => "ico",
        Some("bmp") => "bmp",
        Some("svg") => "svg",
        _ => "img",
    }
}
