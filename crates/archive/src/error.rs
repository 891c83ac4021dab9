//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive extension is not one of the supported container formats.
    #[display("unsupported archive format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The container could not be opened or its index could not be parsed.
    /// Don't retry with the same file.
    #[display("could not open archive: {}", _0.display())]
    ArchiveOpen(#[error(not(source))] PathBuf),
    /// No entry in the archive index has exactly this name.
    #[display("entry not found in archive: {_0}")]
    EntryNotFound(#[error(not(source))] String),
    /// The archive contains no image entries at all.
    #[display("no image found in archive: {}", _0.display())]
    NoImageFound(#[error(not(source))] PathBuf),
    /// Reading an entry's contents failed part-way through.
    #[display("I/O error")]
    Io,
    /// The blocking worker running the archive operation panicked or was
    /// cancelled.
    #[display("archive task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::UnsupportedFormat("7z".to_string()).to_string(),
            "unsupported archive format: 7z"
        );
        assert_eq!(
            ErrorKind::EntryNotFound("p001.jpg".to_string()).to_string(),
            "entry not found in archive: p001.jpg"
        );
        assert_eq!(
            ErrorKind::ArchiveOpen(PathBuf::from("vol1.cbz")).to_string(),
            "could not open archive: vol1.cbz"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::UnsupportedFormat("tar".to_string()).is_retryable());
        assert!(!ErrorKind::ArchiveOpen(PathBuf::from("x.zip")).is_retryable());
        assert!(!ErrorKind::NoImageFound(PathBuf::from("x.zip")).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated entry"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io);
        assert_eq!(*err.unwrap_err(), ErrorKind::Io);
    }
}
