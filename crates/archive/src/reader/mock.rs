//! In-memory archive reader for testing.

use super::ArchiveReader;
use crate::entry::{Entry, is_image};
use crate::error::{ErrorKind, Result};
use crate::format::Format;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// In-memory archive reader for testing.
///
/// Archives are fixed at construction time. The reader still applies the
/// extension-based [`Format`] check, so an archive registered as `vol1.7z`
/// is rejected the same way the real readers reject it.
///
/// Counters record how often each operation was called, which lets tests
/// prove that a cache served a request without touching the archive. An
/// optional gate holds extractions until [`open_gate`](Self::open_gate) or
/// [`release`](Self::release) lets them through, for tests that need a
/// background job to stay in flight or to advance one page at a time.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tankobon_archive::{ArchiveReader, MockArchives};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archives = MockArchives::default().with_archive("vol1.cbz", [
///     ("p001.jpg", b"one".to_vec()),
///     ("p002.jpg", b"two".to_vec()),
/// ]);
/// let data = archives.extract(Path::new("vol1.cbz"), "p002.jpg").await?;
/// assert_eq!(data, b"two");
/// assert_eq!(archives.extract_calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockArchives {
    archives: HashMap<PathBuf, Vec<(String, Vec<u8>)>>,
    broken: HashSet<(PathBuf, String)>,
    /// Number of extractions allowed through; `usize::MAX` once opened.
    gate: Option<watch::Sender<usize>>,
    /// Arrival order of gated extractions.
    tickets: AtomicUsize,
    list_calls: AtomicUsize,
    extract_calls: AtomicUsize,
}

impl MockArchives {
    /// Register an archive. Entry names ending in `/` are directories.
    pub fn with_archive(
        mut self,
        path: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>,
    ) -> Self {
        let entries = entries.into_iter().map(|(name, data)| (name.into(), data.into())).collect();
        self.archives.insert(path.into(), entries);
        self
    }

    /// Make extraction of one entry fail with an I/O error. The entry is
    /// still listed.
    pub fn with_broken_entry(mut self, path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        self.broken.insert((path.into(), entry.into()));
        self
    }

    /// Hold every extraction until it is released.
    pub fn gated(mut self) -> Self {
        self.gate = Some(watch::Sender::new(0));
        self
    }

    /// Release all current and future extractions.
    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.send_replace(usize::MAX);
        }
    }

    /// Let `count` more extractions through, in the order they reached the
    /// gate.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.send_modify(|released| *released = released.saturating_add(count));
        }
    }

    /// Number of `list_images` calls made so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `extract` and `extract_first_image` calls made so far.
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    fn archive(&self, path: &Path) -> Result<&[(String, Vec<u8>)]> {
        Format::from_path(path)?;
        match self.archives.get(path) {
            Some(entries) => Ok(entries),
            None => exn::bail!(ErrorKind::ArchiveOpen(path.to_path_buf())),
        }
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);
            let mut released = gate.subscribe();
            // The sender lives as long as `self`, so this only errors if the
            // mock is being torn down mid-call.
            let _ = released.wait_for(|released| *released > ticket).await;
        }
    }
}

#[async_trait]
impl ArchiveReader for MockArchives {
    async fn list_images(&self, archive: &Path) -> Result<Vec<Entry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self
            .archive(archive)?
            .iter()
            .filter(|(name, _)| !name.ends_with('/') && is_image(name))
            .map(|(name, data)| Entry::new(name.as_str(), data.len() as u64))
            .collect();
        Ok(entries)
    }

    async fn extract(&self, archive: &Path, entry: &str) -> Result<Vec<u8>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self.archive(archive)?;
        self.wait_for_gate().await;
        if self.broken.contains(&(archive.to_path_buf(), entry.to_string())) {
            exn::bail!(ErrorKind::Io);
        }
        match entries.iter().find(|(name, _)| name == entry) {
            Some((_, data)) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::EntryNotFound(entry.to_string())),
        }
    }

    async fn extract_first_image(&self, archive: &Path) -> Result<Vec<u8>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self.archive(archive)?;
        self.wait_for_gate().await;
        entries
            .iter()
            .find(|(name, _)| !name.ends_with('/') && is_image(name))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| exn::Exn::from(ErrorKind::NoImageFound(archive.to_path_buf())))
    }
}
