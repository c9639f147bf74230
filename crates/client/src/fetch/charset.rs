//! Character set detection for HTML bodies.
//!
//! Precedence: byte-order mark, then the `Content-Type` charset, then a
//! `<meta charset>` / `http-equiv` declaration near the top of the
//! document, then UTF-8.

use encoding_rs::{Encoding, UTF_8};

const META_SNIFF_BYTES: usize = 4096;

/// Decode a page body to text using its declared character set.
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| charset_from_meta(body).and_then(|label| Encoding::for_label(label.as_bytes())))
        .unwrap_or(UTF_8);

    // `decode` gives a BOM precedence over the chosen encoding.
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page body contained malformed sequences");
    }
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!label.is_empty()).then(|| label.to_string())
    })
}

fn charset_from_meta(body: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    let lower = prefix.to_ascii_lowercase();

    let mut from = 0;
    while let Some(found) = lower[from..].find("charset=") {
        let start = from + found + "charset=".len();
        let label: String = lower[start..]
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| !matches!(c, '"' | '\'' | ';' | '>' | '/') && !c.is_whitespace())
            .collect();
        if !label.is_empty() {
            return Some(label);
        }
        from = start;
    }

    None
}
