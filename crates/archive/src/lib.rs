//! Page listing and extraction for comic archives.
//!
//! This crate wraps the zip and RAR container libraries behind a single
//! [`ArchiveReader`] trait, providing:
//!
//! - **Format selection** from file extensions ([`Format::from_path`]):
//!   `.zip`/`.cbz` and `.rar`/`.cbr`
//! - **Image listing** in the archive's native order, with directories and
//!   non-image entries filtered out ([`ArchiveReader::list_images`])
//! - **Extraction** of a named entry ([`ArchiveReader::extract`]) or of the
//!   first image, for thumbnails ([`ArchiveReader::extract_first_image`])
//!
//! Container libraries are synchronous; the readers run them on Tokio's
//! blocking pool. An in-memory [`MockArchives`] is available behind the
//! `mock` feature for other crates' tests.

mod entry;
pub mod error;
mod format;
pub mod reader;

pub use crate::entry::{Entry, IMAGE_EXTENSIONS, is_image};
pub use crate::format::Format;
#[cfg(feature = "mock")]
pub use crate::reader::MockArchives;
pub use crate::reader::{ArchiveReader, Archives, RarReader, ZipReader};
use std::sync::Arc;

pub type ArchiveHandle = Arc<dyn ArchiveReader + Send + Sync>;
