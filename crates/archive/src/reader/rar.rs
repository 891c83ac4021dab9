//! RAR/CBR archive reader.

use super::{ArchiveReader, blocking};
use crate::entry::{Entry, is_image};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;
use unrar::Archive;

/// Reader for RAR containers (`.rar`, `.cbr`).
///
/// RAR has no random access: every call walks the headers from the start of
/// the file, skipping over the packed data of entries it doesn't want.
#[derive(Clone, Copy, Debug, Default)]
pub struct RarReader;

impl RarReader {
    fn list_sync(path: &Path) -> Result<Vec<Entry>> {
        let archive = Archive::new(path)
            .open_for_listing()
            .or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
        let mut entries = Vec::new();
        for header in archive {
            let header = header.or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
            let name = header.filename.to_string_lossy();
            if header.is_directory() || !is_image(&name) {
                continue;
            }
            entries.push(Entry::new(name, header.unpacked_size));
        }
        Ok(entries)
    }

    fn extract_sync(path: &Path, entry: &str) -> Result<Vec<u8>> {
        let mut archive = Archive::new(path)
            .open_for_processing()
            .or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
        while let Some(header) = archive.read_header().or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))? {
            if header.entry().filename.to_string_lossy() == entry {
                let (data, _rest) = header.read().or_raise(|| ErrorKind::Io)?;
                return Ok(data);
            }
            archive = header.skip().or_raise(|| ErrorKind::Io)?;
        }
        exn::bail!(ErrorKind::EntryNotFound(entry.to_string()))
    }

    fn extract_first_sync(path: &Path) -> Result<Vec<u8>> {
        // Headers before this index have been dealt with: skipped, or read and
        // found unreadable.
        let mut resume = 0;
        'reopen: loop {
            let mut archive = Archive::new(path)
                .open_for_processing()
                .or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
            let mut index = 0;
            while let Some(header) = archive.read_header().or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))? {
                let wanted = index >= resume && {
                    let entry = header.entry();
                    !entry.is_directory() && is_image(&entry.filename.to_string_lossy())
                };
                if !wanted {
                    archive = header.skip().or_raise(|| ErrorKind::Io)?;
                    index += 1;
                    continue;
                }
                let name = header.entry().filename.display().to_string();
                match header.read() {
                    Ok((data, _rest)) => return Ok(data),
                    Err(err) => {
                        // A failed read consumes the cursor; start over and
                        // skip past the broken entry.
                        tracing::warn!(archive = %path.display(), entry = %name, error = %err, "Skipping unreadable image");
                        resume = index + 1;
                        continue 'reopen;
                    },
                }
            }
            exn::bail!(ErrorKind::NoImageFound(path.to_path_buf()))
        }
    }
}

#[async_trait]
impl ArchiveReader for RarReader {
    #[instrument(skip(self), fields(archive = %archive.display()))]
    async fn list_images(&self, archive: &Path) -> Result<Vec<Entry>> {
        let path: PathBuf = archive.to_path_buf();
        blocking(move || Self::list_sync(&path)).await
    }

    #[instrument(skip(self), fields(archive = %archive.display()))]
    async fn extract(&self, archive: &Path, entry: &str) -> Result<Vec<u8>> {
        let path: PathBuf = archive.to_path_buf();
        let entry = entry.to_string();
        blocking(move || Self::extract_sync(&path, &entry)).await
    }

    #[instrument(skip(self), fields(archive = %archive.display()))]
    async fn extract_first_image(&self, archive: &Path) -> Result<Vec<u8>> {
        let path: PathBuf = archive.to_path_buf();
        blocking(move || Self::extract_first_sync(&path)).await
    }
}
