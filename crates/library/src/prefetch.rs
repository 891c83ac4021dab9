//! Read-ahead of the pages following the one being viewed.
//!
//! Each archive has at most one running job. Job records are kept after the
//! job finishes so progress can still be queried, and are never removed.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tankobon_archive::{ArchiveHandle, ArchiveReader, Entry};
use tankobon_cache::{CacheKey, ImageCache};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Result of asking for a read-ahead.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefetchStart {
    /// A new job was spawned; it runs in the background.
    Started { current_index: usize, snapshot: PrefetchSnapshot },
    /// A job for this archive is still running; nothing new was started.
    AlreadyRunning(PrefetchSnapshot),
}

impl PrefetchStart {
    pub fn snapshot(&self) -> &PrefetchSnapshot {
        match self {
            Self::Started { snapshot, .. } | Self::AlreadyRunning(snapshot) => snapshot,
        }
    }
}

/// Progress of a read-ahead job at the time it was queried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchSnapshot {
    pub archive_path: PathBuf,
    /// Image entries in the archive when the job started.
    pub total_images: usize,
    /// Entries attempted so far, failures included.
    pub prefetched: usize,
    pub failed: usize,
    pub in_progress: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    #[serde(rename = "progress_percent")]
    pub percent: f64,
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Cached,
    Extracted,
    Failed,
}

#[derive(Debug)]
struct Job {
    total: usize,
    prefetched: usize,
    failed: usize,
    in_progress: bool,
    started_at: OffsetDateTime,
    started: Instant,
}

impl Job {
    fn new(total: usize) -> Self {
        Self {
            total,
            prefetched: 0,
            failed: 0,
            in_progress: true,
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    fn snapshot(&self, archive: &Path) -> PrefetchSnapshot {
        let percent = if self.total == 0 {
            0.0
        } else {
            self.prefetched as f64 / self.total as f64 * 100.0
        };
        PrefetchSnapshot {
            archive_path: archive.to_path_buf(),
            total_images: self.total,
            prefetched: self.prefetched,
            failed: self.failed,
            in_progress: self.in_progress,
            start_time: self.started_at,
            elapsed: self.started.elapsed(),
            percent,
        }
    }
}

/// Job records, keyed by archive path.
#[derive(Debug, Default)]
pub(crate) struct Jobs {
    table: RwLock<HashMap<PathBuf, Job>>,
}

impl Jobs {
    /// Register a running job for `archive` unless one is already running.
    ///
    /// `Ok` carries the new record, `Err` the record of the job that is
    /// still running. Finished records are overwritten.
    pub(crate) async fn begin(
        &self,
        archive: &Path,
        total: usize,
    ) -> std::result::Result<PrefetchSnapshot, PrefetchSnapshot> {
        let mut table = self.table.write().await;
        if let Some(job) = table.get(archive)
            && job.in_progress
        {
            return Err(job.snapshot(archive));
        }
        let job = Job::new(total);
        let snapshot = job.snapshot(archive);
        table.insert(archive.to_path_buf(), job);
        Ok(snapshot)
    }

    pub(crate) async fn record(&self, archive: &Path, outcome: Outcome) {
        if let Some(job) = self.table.write().await.get_mut(archive) {
            job.prefetched += 1;
            if outcome == Outcome::Failed {
                job.failed += 1;
            }
        }
    }

    pub(crate) async fn finish(&self, archive: &Path) {
        if let Some(job) = self.table.write().await.get_mut(archive) {
            job.in_progress = false;
        }
    }

    pub(crate) async fn status(&self, archive: &Path) -> Option<PrefetchSnapshot> {
        self.table.read().await.get(archive).map(|job| job.snapshot(archive))
    }
}

/// The pages one job will attempt, in listing order.
#[derive(Debug)]
pub(crate) struct PrefetchJob {
    archive: PathBuf,
    pending: Vec<Entry>,
}

impl PrefetchJob {
    pub(crate) fn new(archive: &Path, entries: Vec<Entry>, current_index: usize, window: usize) -> Self {
        let pending = entries.into_iter().skip(current_index + 1).take(window).collect();
        Self {
            archive: archive.to_path_buf(),
            pending,
        }
    }

    /// Attempt every pending page, then mark the job finished.
    ///
    /// A failed page is logged and counted; it does not stop the job.
    /// Cancellation stops the job between pages, or abandons the page being
    /// extracted.
    #[instrument(skip_all, fields(archive = %self.archive.display(), pending = self.pending.len()))]
    pub(crate) async fn run(
        self,
        archives: ArchiveHandle,
        cache: Arc<ImageCache>,
        jobs: Arc<Jobs>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Prefetch started");
        let mut attempted = 0;
        for entry in &self.pending {
            if shutdown.is_cancelled() {
                break;
            }
            let key = CacheKey::new(&self.archive, &entry.name);
            let outcome = if cache.contains(&key).await {
                tracing::debug!(entry = %entry.name, "Page already cached");
                Outcome::Cached
            } else {
                let extracted = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    extracted = archives.extract(&self.archive, &entry.name) => extracted,
                };
                match extracted {
                    Ok(data) => {
                        cache.set(key, data).await;
                        tracing::debug!(entry = %entry.name, "Page prefetched");
                        Outcome::Extracted
                    },
                    Err(err) => {
                        tracing::warn!(entry = %entry.name, error = ?err, "Failed to prefetch page");
                        Outcome::Failed
                    },
                }
            };
            jobs.record(&self.archive, outcome).await;
            attempted += 1;
        }
        jobs.finish(&self.archive).await;
        if shutdown.is_cancelled() {
            tracing::info!(attempted, "Prefetch cancelled");
        } else {
            tracing::info!(attempted, "Prefetch completed");
        }
    }
}
