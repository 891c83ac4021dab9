//! Library Error Types
//!
//! Archive errors are re-raised with their kind preserved, so callers can
//! still tell a missing page from an unreadable volume without walking the
//! error tree.

use derive_more::{Display, Error};
use exn::ResultExt;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("{_0}")]
    Archive(#[error(not(source))] tankobon_archive::error::ErrorKind),
    /// The page a read-ahead was requested from is not in the volume.
    #[display("current entry not found in archive: {_0}")]
    CurrentEntryNotFound(#[error(not(source))] String),
    /// No read-ahead has ever been started for this archive.
    #[display("no prefetch job for this archive")]
    NoSuchJob,
    #[display("prefetch is disabled")]
    PrefetchDisabled,
    #[display("image could not be rendered")]
    Render,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Archive(kind) => kind.is_retryable(),
            _ => false,
        }
    }
}

pub(crate) trait ArchiveResultExt<T> {
    /// Raise an archive error as [`ErrorKind::Archive`] with the same kind.
    fn or_archive(self) -> Result<T>;
}

impl<T> ArchiveResultExt<T> for tankobon_archive::error::Result<T> {
    fn or_archive(self) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = (*err).clone();
                Err(err).or_raise(|| ErrorKind::Archive(kind))
            },
        }
    }
}
