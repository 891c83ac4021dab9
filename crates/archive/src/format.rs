use crate::error::{Error, ErrorKind, Result};
use crate::reader::{ArchiveReader, RarReader, ZipReader};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A supported archive container.
///
/// Selection is driven by the file extension only; the container's magic
/// bytes are never sniffed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Zip container (.zip, .cbz)
    Zip,
    /// RAR container (.rar, .cbr)
    Rar,
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" | "cbz" => Ok(Format::Zip),
            "rar" | "cbr" => Ok(Format::Rar),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Zip => f.write_str("zip"),
            Format::Rar => f.write_str("rar"),
        }
    }
}

impl Format {
    /// Detect the archive format from a file extension.
    ///
    /// Any extension other than `zip`, `cbz`, `rar` or `cbr` (in any case) is
    /// an [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) error, as is a
    /// path with no extension at all.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string()));
        };
        ext.parse()
    }

    /// Whether the path names a container this crate can read.
    #[must_use]
    pub fn is_archive(path: impl AsRef<Path>) -> bool {
        Self::from_path(path).is_ok()
    }

    /// The leaf reader implementing this format.
    pub fn reader(self) -> &'static dyn ArchiveReader {
        match self {
            Format::Zip => &ZipReader,
            Format::Rar => &RarReader,
        }
    }
}
