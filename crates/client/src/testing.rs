//! In-process [`HttpSource`] fake shared by unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Url;
use stashly_core::Error;

use crate::fetch::{FetchResponse, HttpSource, Resource};

enum Route {
    Body { final_url: Url, content_type: Option<String>, body: Bytes },
    Status(u16),
}

#[derive(Default)]
pub(crate) struct FakeSource {
    routes: HashMap<String, Route>,
    delay: Option<Duration>,
    requests: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
}

fn key(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, url: &str, html: &str) -> Self {
        self.redirect(url, url, html)
    }

    pub(crate) fn redirect(mut self, from: &str, to: &str, html: &str) -> Self {
        let route = Route::Body {
            final_url: Url::parse(to).unwrap(),
            content_type: Some("text/html; charset=utf-8".into()),
            body: Bytes::from(html.to_string()),
        };
        self.routes.insert(key(from), route);
        self
    }

    pub(crate) fn image(self, url: &str, content_type: Option<&str>, body: Vec<u8>) -> Self {
        self.body(url, content_type, body)
    }

    pub(crate) fn body(mut self, url: &str, content_type: Option<&str>, body: Vec<u8>) -> Self {
        let route = Route::Body {
            final_url: Url::parse(url).unwrap(),
            content_type: content_type.map(str::to_string),
            body: Bytes::from(body),
        };
        self.routes.insert(key(url), route);
        self
    }

    pub(crate) fn status(mut self, url: &str, code: u16) -> Self {
        self.routes.insert(key(url), Route::Status(code));
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn requests_for(&self, url: &str) -> usize {
        self.per_url.lock().get(&key(url)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpSource for FakeSource {
    async fn get(&self, url: &Url, _resource: Resource) -> Result<FetchResponse, Error> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.per_url.lock().entry(url.to_string()).or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.routes.get(url.as_str()) {
            Some(Route::Body { final_url, content_type, body }) => Ok(FetchResponse {
                url: url.clone(),
                final_url: final_url.clone(),
                content_type: content_type.clone(),
                bytes: body.clone(),
            }),
            Some(Route::Status(code)) => Err(Error::HttpError(format!("status {} for {}", code, url))),
            None => Err(Error::HttpError(format!("status 404 for {}", url))),
        }
    }
}

/// Encode a solid `width`x`height` PNG.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
