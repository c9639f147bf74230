//! Per-URL preview cache on the filesystem.
//!
//! Each URL owns one directory under the cache root, named by the hex MD5
//! digest of the raw URL string:
//!
//! ```text
//! <cache_root>/<md5hex(url)>/
//!     metadata.json      serialized PreviewRecord
//!     thumbnail.<ext>    optional raw image bytes
//!     favicon.<ext>      optional raw image bytes
//!     <kind>.undecodable source URL whose bytes failed to decode
//! ```
//!
//! Entries are created lazily on first fetch and removed by the consumer
//! when the owning bookmark is deleted.

pub mod hash;
pub mod locator;

pub use hash::cache_key;
pub use locator::{AssetKind, CacheLocator, METADATA_FILE, UNDECODABLE_EXT};
