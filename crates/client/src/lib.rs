//! Client code for stashly link previews.
//!
//! This crate provides the HTTP fetch pipeline, preview extraction, image
//! materialization, and the background runner shared by the desktop shell
//! and the CLI.

pub mod extract;
pub mod fetch;
pub mod images;
pub mod preview;
pub mod runner;

#[cfg(test)]
mod testing;

pub use extract::{extract_preview, resolve_favicon};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, HttpSource, Resource};
pub use images::{ImageMaterializer, PreviewImages};
pub use preview::PreviewFetcher;
pub use runner::{TaskRunner, Ticket, WorkerPool};
