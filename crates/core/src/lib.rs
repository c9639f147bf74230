//! Core types and shared functionality for Stashly link previews.
//!
//! This crate provides:
//! - The preview record and bookmark types
//! - The per-URL on-disk cache layout
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod record;

pub use cache::{AssetKind, CacheLocator};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use record::{BookmarkEntry, PreviewRecord, load_bookmarks};
