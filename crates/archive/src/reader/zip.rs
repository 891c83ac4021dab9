//! Zip/CBZ archive reader.

use super::{ArchiveReader, blocking};
use crate::entry::{Entry, is_image};
use crate::error::{ErrorKind, Result};
use ::zip::ZipArchive;
use ::zip::result::ZipError;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;

type Container = ZipArchive<BufReader<File>>;

/// Reader for zip containers (`.zip`, `.cbz`).
///
/// The zip central directory is parsed on every call; for comic volumes of a
/// few hundred pages that is cheaper than keeping handles around.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipReader;

impl ZipReader {
    fn open(path: &Path) -> Result<Container> {
        let file = File::open(path).or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
        ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))
    }

    fn list_sync(path: &Path) -> Result<Vec<Entry>> {
        let mut archive = Self::open(path)?;
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            // Raw access skips decryption/decompression setup; only the header is needed.
            let file = archive.by_index_raw(index).or_raise(|| ErrorKind::ArchiveOpen(path.to_path_buf()))?;
            if file.is_dir() || !is_image(file.name()) {
                continue;
            }
            entries.push(Entry::new(file.name(), file.size()));
        }
        Ok(entries)
    }

    fn extract_sync(path: &Path, entry: &str) -> Result<Vec<u8>> {
        let mut archive = Self::open(path)?;
        let mut file = match archive.by_name(entry) {
            Err(ZipError::FileNotFound) => exn::bail!(ErrorKind::EntryNotFound(entry.to_string())),
            result => result.or_raise(|| ErrorKind::Io)?,
        };
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut data).or_raise(|| ErrorKind::Io)?;
        Ok(data)
    }

    fn extract_first_sync(path: &Path) -> Result<Vec<u8>> {
        let mut archive = Self::open(path)?;
        for index in 0..archive.len() {
            let mut file = match archive.by_index(index) {
                Ok(file) => file,
                Err(err) => {
                    tracing::warn!(archive = %path.display(), index, error = %err, "Skipping unreadable zip entry");
                    continue;
                },
            };
            if file.is_dir() || !is_image(file.name()) {
                continue;
            }
            let mut data = Vec::new();
            match file.read_to_end(&mut data) {
                Ok(_) => return Ok(data),
                Err(err) => {
                    tracing::warn!(archive = %path.display(), entry = file.name(), error = %err, "Skipping unreadable image");
                },
            }
        }
        exn::bail!(ErrorKind::NoImageFound(path.to_path_buf()))
    }
}

#[async_trait]
impl ArchiveReader for ZipReader {
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
