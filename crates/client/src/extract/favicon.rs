//! Favicon discovery from `<link rel="...icon...">` elements.

use scraper::{Html, Selector};
use url::Url;

use crate::fetch::origin_of;

/// Accepted `rel` values, highest priority first.
pub const ICON_RELS: [&str; 4] = ["icon", "shortcut icon", "apple-touch-icon", "apple-touch-icon-precomposed"];

struct IconLink<'a> {
    rel_tokens: Vec<String>,
    href: &'a str,
}

/// Resolve the page's favicon to an absolute URL.
///
/// For each entry of [`ICON_RELS`] in order, the first link (document
/// order) whose rel tokens include every token of that entry wins. Its href
/// is resolved against the page origin, so `//cdn`, `/path` and absolute
/// forms all come out absolute. Without a usable link the result is
/// `<origin>/favicon.ico`. Returns an empty string only when the page URL
/// has no host.
pub fn resolve_favicon(document: &Html, page_url: &Url) -> String {
    let Some(origin) = origin_of(page_url) else {
        return String::new();
    };

    let selector = Selector::parse("link[href]").expect("invalid selector");
    let links: Vec<IconLink<'_>> = document
        .select(&selector)
        .filter_map(|node| {
            let rel = node.value().attr("rel")?.to_ascii_lowercase();
            if !rel.contains("icon") {
                return None;
            }
            let href = node.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(IconLink { rel_tokens: rel.split_whitespace().map(str::to_string).collect(), href })
        })
        .collect();

    for wanted in ICON_RELS {
        for link in links
            .iter()
            .filter(|link| wanted.split_whitespace().all(|t| link.rel_tokens.iter().any(|r| r == t)))
        {
            match origin.join(link.href) {
                Ok(resolved) => return resolved.to_string(),
                Err(e) => tracing::debug!(href = link.href, "skipping unresolvable icon href: {}", e),
            }
        }
    }

    origin.join("favicon.ico").map(|u| u.to_string()).unwrap_or_default()
}
