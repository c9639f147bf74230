//! URL parsing for page and image requests.
//!
//! Cache keys always use the raw bookmark string; this normalization only
//! decides what is actually requested.

/// Error type for URL parsing failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a bookmark URL into a requestable HTTP(S) URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Reject anything but http/https
/// 4. Remove fragment (#...)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !is_http(&parsed) {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Parse an asset URL taken verbatim from a preview record.
///
/// Unlike [`canonicalize`] no scheme is assumed: relative or scheme-less
/// references are rejected.
pub fn parse_asset_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if !is_http(&parsed) {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    Ok(parsed)
}

/// `scheme://host[:port]/` of a URL.
pub fn origin_of(url: &url::Url) -> Option<url::Url> {
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
        None => format!("{}://{}/", url.scheme(), host),
    };
    url::Url::parse(&origin).ok()
}

fn is_http(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com/page").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com#section").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_parse_asset_url_rejects_relative() {
        assert!(matches!(parse_asset_url("/images/og.png"), Err(UrlError::InvalidUrl(_))));
        assert!(matches!(parse_asset_url("data:image/png;base64,AAAA"), Err(UrlError::UnsupportedScheme(_))));
        assert!(parse_asset_url("http://a.com/og.png").is_ok());
    }

    #[test]
    fn test_origin_of() {
        let url = url::Url::parse("https://a.com/x/y?z=1").unwrap();
        assert_eq!(origin_of(&url).unwrap().as_str(), "https://a.com/");

        let url = url::Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(origin_of(&url).unwrap().as_str(), "http://127.0.0.1:8080/");
    }
}
