//! HTTP fetch pipeline for pages and preview images.
//!
//! ### Request shape
//! - Browser-like `User-Agent` (default `Mozilla/5.0`); many sites reject
//!   the default agent of HTTP libraries.
//! - Bounded timeout (default 8s), no retries.
//! - Max redirects: 5
//! - Separate body caps for HTML pages and images.
//!
//! Everything network-facing goes through [`HttpSource`], so the preview
//! pipeline can be driven by an in-process fake in tests.

pub mod charset;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::charset::decode_html;
pub use self::url::{UrlError, canonicalize, origin_of, parse_asset_url};

use stashly_core::{AppConfig, Error};

/// What a request is for; selects the Accept header and body cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Page,
    Image,
}

impl Resource {
    fn accept(self) -> &'static str {
        match self {
            Resource::Page => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            Resource::Image => "image/*,*/*;q=0.8",
        }
    }
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "Mozilla/5.0")
    pub user_agent: String,

    /// Maximum HTML body size in bytes (default: 5MB)
    pub max_page_bytes: usize,

    /// Maximum image body size in bytes (default: 2MB)
    pub max_image_bytes: usize,

    /// Request timeout (default: 8s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            max_page_bytes: 5 * 1024 * 1024,
            max_image_bytes: 2 * 1024 * 1024,
            timeout: Duration::from_millis(8000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_page_bytes: config.max_page_bytes,
            max_image_bytes: config.max_image_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

impl FetchConfig {
    fn max_bytes(&self, resource: Resource) -> usize {
        match resource {
            Resource::Page => self.max_page_bytes,
            Resource::Image => self.max_image_bytes,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
}

/// Source of HTTP responses for the preview pipeline.
///
/// Implementations return `Ok` only for success statuses.
#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get(&self, url: &Url, resource: Resource) -> Result<FetchResponse, Error>;
}

/// reqwest-backed [`HttpSource`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

fn classify(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(url.to_string())
    } else {
        Error::HttpError(format!("network error: {}", err))
    }
}

#[async_trait]
impl HttpSource for FetchClient {
    async fn get(&self, url: &Url, resource: Resource) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let max_bytes = self.config.max_bytes(resource);

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, resource.accept())
            .send()
            .await
            .map_err(|e| classify(url, &e))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", status.as_u16(), url)));
        }

        if let Some(len) = response.content_length()
            && len as usize > max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| classify(url, &e))?;

        if bytes.len() > max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: url.clone(), final_url, content_type, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "Mozilla/5.0");
        assert_eq!(config.max_page_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_image_bytes, 2 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(8000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, user_agent: "Custom/1.0".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "Custom/1.0");
        assert_eq!(config.max_bytes(Resource::Image), app.max_image_bytes);
        assert_eq!(config.max_bytes(Resource::Page), app.max_page_bytes);
    }

    #[test]
    fn test_resource_accept() {
        assert!(Resource::Page.accept().starts_with("text/html"));
        assert!(Resource::Image.accept().starts_with("image/"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
