//! Archive reader trait and implementations.
//!
//! This module defines the `ArchiveReader` trait, which provides a unified
//! interface for reading pages out of comic archives, regardless of the
//! container format backing them.

#[cfg(feature = "mock")]
mod mock;
mod rar;
mod zip;

#[cfg(feature = "mock")]
pub use self::mock::MockArchives;
pub use self::rar::RarReader;
pub use self::zip::ZipReader;
use crate::entry::Entry;
use crate::error::{ErrorKind, Result};
use crate::format::Format;
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;

/// Unified interface for archive readers.
///
/// Every call opens its own handle to the archive container and releases it
/// before returning, on success and on error alike. Nothing is kept open
/// between calls, so implementations are stateless and cheap to share.
///
/// # Entry Names
/// Entry names are the full paths stored in the archive index (e.g.
/// `chapter 01/p001.jpg`), not just the file name. Matching is exact and
/// case-sensitive.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tankobon_archive::{Archives, ArchiveReader, error::Result};
///
/// async fn cover_and_count(path: &Path) -> Result<(Vec<u8>, usize)> {
///     let archives = Archives;
///     let pages = archives.list_images(path).await?;
///     let cover = archives.extract_first_image(path).await?;
///     Ok((cover, pages.len()))
/// }
/// ```
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// List the image entries of an archive in the archive's own order.
    ///
    /// Directories and entries without an image extension (see
    /// [`is_image`](crate::is_image)) are left out. Returns
    /// [`ArchiveOpen`](crate::error::ErrorKind::ArchiveOpen) if the
    /// container cannot be opened or parsed.
    async fn list_images(&self, archive: &Path) -> Result<Vec<Entry>>;

    /// Read the entry named `entry` fully into memory.
    ///
    /// Returns [`EntryNotFound`](crate::error::ErrorKind::EntryNotFound) if
    /// no entry in the index has exactly that name.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tankobon_archive::{ArchiveReader, error::Result};
    /// # async fn example(reader: &dyn ArchiveReader) -> Result<()> {
    /// let page = reader.extract(Path::new("/manga/vol1.cbz"), "p002.jpg").await?;
    /// println!("Read {} bytes", page.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn extract(&self, archive: &Path, entry: &str) -> Result<Vec<u8>>;

    /// Read the first image entry of an archive (used for thumbnails).
    ///
    /// Returns [`NoImageFound`](crate::error::ErrorKind::NoImageFound) if the
    /// archive contains no readable image entries.
    async fn extract_first_image(&self, archive: &Path) -> Result<Vec<u8>>;
}

/// Format-selecting archive reader.
///
/// Chooses [`ZipReader`] or [`RarReader`] from the archive's file extension
/// on every call, failing with
/// [`UnsupportedFormat`](crate::error::ErrorKind::UnsupportedFormat) for
/// anything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct Archives;

#[async_trait]
impl ArchiveReader for Archives {
    async fn list_images(&self, archive: &Path) -> Result<Vec<Entry>> {
        Format::from_path(archive)?.reader().list_images(archive).await
    }

    async fn extract(&self, archive: &Path, entry: &str) -> Result<Vec<u8>> {
        Format::from_path(archive)?.reader().extract(archive, entry).await
    }

    async fn extract_first_image(&self, archive: &Path) -> Result<Vec<u8>> {
        Format::from_path(archive)?.reader().extract_first_image(archive).await
    }
}

/// Run synchronous archive work on Tokio's blocking pool.
///
/// Archive libraries only offer blocking [`Read`](std::io::Read)-based APIs;
/// keep them off the async worker threads.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.or_raise(|| ErrorKind::Task)?
}
