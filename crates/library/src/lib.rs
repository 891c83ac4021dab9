//! Comic page service.
//!
//! [`Library`] ties the archive readers, the page cache and the image
//! transforms together behind the operations a request layer needs: fetch a
//! page, list a volume, render a thumbnail, and read ahead of the reader.
//!
//! Read-ahead runs in background tasks owned by the [`Library`]. Its progress
//! is reported through [`PrefetchSnapshot`], which serializes to the JSON
//! status document clients poll.

pub mod error;
mod prefetch;
mod service;
mod settings;

pub use crate::prefetch::{PrefetchSnapshot, PrefetchStart};
pub use crate::service::{Library, Page};
pub use crate::settings::Settings;
pub use tankobon_archive::{ArchiveHandle, Archives, Entry};
pub use tankobon_cache::CacheStats;
pub use tankobon_render::Transform;
