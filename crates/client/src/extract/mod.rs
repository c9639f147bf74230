//! Link-preview extraction from HTML documents.
//!
//! ### Fields
//! - Title: `<title>` text, whitespace-collapsed; the source URL when absent.
//! - Description: `description` meta tag, then `og:description`.
//! - Thumbnail: `og:image`, kept verbatim (may be relative).
//! - Favicon: see [`favicon::resolve_favicon`].
//!
//! Malformed markup is not an error: html5ever always yields a tree, and
//! anything missing from it just leaves the field empty.

pub mod favicon;

pub use favicon::{ICON_RELS, resolve_favicon};

use scraper::{Html, Selector};
use stashly_core::PreviewRecord;
use url::Url;

/// Build a preview record from a page's HTML.
///
/// `source_url` is the bookmark string (used as the title fallback);
/// `page_url` is where the document was actually served from.
pub fn extract_preview(html: &str, source_url: &str, page_url: &Url) -> PreviewRecord {
    let document = Html::parse_document(html);

    let title = document_title(&document).unwrap_or_else(|| source_url.to_string());
    let description = meta_content(&document, "description")
        .or_else(|| meta_content(&document, "og:description"))
        .unwrap_or_default();
    let thumbnail = meta_content(&document, "og:image").unwrap_or_default();
    let favicon = resolve_favicon(&document, page_url);

    PreviewRecord { title, description, thumbnail, favicon }
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").expect("invalid selector");
    let node = document.select(&selector).next()?;
    let text = collapse_whitespace(&node.text().collect::<String>());
    if text.is_empty() { None } else { Some(text) }
}

/// First non-empty `content` of a `<meta>` whose `name` or `property`
/// equals `key` (case-insensitive).
fn meta_content(document: &Html, key: &str) -> Option<String> {
    let selector = Selector::parse("meta[content]").expect("invalid selector");
    document
        .select(&selector)
        .filter(|node| {
            let attrs = node.value();
            [attrs.attr("name"), attrs.attr("property")]
                .into_iter()
                .flatten()
                .any(|v| v.trim().eq_ignore_ascii_case(key))
        })
        .filter_map(|node| node.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
