use crate::error::{ArchiveResultExt, ErrorKind, Result};
use crate::prefetch::{Jobs, PrefetchJob, PrefetchSnapshot, PrefetchStart};
use crate::settings::Settings;
use exn::{OptionExt, ResultExt};
use std::path::Path;
use std::sync::Arc;
use tankobon_archive::{ArchiveHandle, ArchiveReader, Entry};
use tankobon_cache::{CacheKey, CacheStats, ImageCache, sweep_periodically};
use tankobon_render::{OUTPUT_CONTENT_TYPE, Transform, content_type};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::instrument;

/// Page bytes plus the MIME type to serve them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub data: Arc<[u8]>,
    pub content_type: &'static str,
}

/// Long-lived page service shared by every request.
///
/// Owns the page cache, the read-ahead job table and every background task
/// (the cache sweeper and running read-ahead jobs). Cloning is cheap and
/// every clone shares the same state.
///
/// Archive paths are used as given: they are not canonicalised or checked
/// for traversal, and two spellings of the same file are two archives.
#[derive(Clone)]
pub struct Library {
    archives: ArchiveHandle,
    cache: Arc<ImageCache>,
    jobs: Arc<Jobs>,
    settings: Settings,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Library {
    /// Create the service and start its cache sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(archives: ArchiveHandle, settings: Settings) -> Self {
        let cache = Arc::new(ImageCache::new(settings.cache_size, settings.cache_ttl));
        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();
        tasks.spawn(sweep_periodically(Arc::clone(&cache), settings.sweep_interval, shutdown.clone()));
        Self {
            archives,
            cache,
            jobs: Arc::new(Jobs::default()),
            settings,
            shutdown,
            tasks,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bytes of one page, from the cache or else from the archive.
    ///
    /// A page read from the archive is cached before it is returned.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn fetch_entry(&self, archive: &Path, entry: &str) -> Result<Arc<[u8]>> {
        let key = CacheKey::new(archive, entry);
        if let Some(data) = self.cache.get(&key).await {
            tracing::debug!("Cache hit");
            return Ok(data);
        }
        tracing::debug!("Cache miss");
        let data: Arc<[u8]> = self.archives.extract(archive, entry).await.or_archive()?.into();
        self.cache.set(key, Arc::clone(&data)).await;
        Ok(data)
    }

    /// Image entries of a volume, in archive order.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn list_entries(&self, archive: &Path) -> Result<Vec<Entry>> {
        self.archives.list_images(archive).await.or_archive()
    }

    /// One page, resized when `transform` asks for it.
    ///
    /// Requested dimensions are capped at the configured maximum. A request
    /// without dimensions returns the stored bytes untouched; anything else
    /// is re-encoded as JPEG.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn render_entry(&self, archive: &Path, entry: &str, transform: Transform) -> Result<Page> {
        let data = self.fetch_entry(archive, entry).await?;
        let transform = transform.clamp(self.settings.max_width, self.settings.max_height);
        if !transform.is_resize() {
            return Ok(Page { data, content_type: content_type(entry) });
        }
        Ok(Page {
            data: render(data, transform).await?.into(),
            content_type: OUTPUT_CONTENT_TYPE,
        })
    }

    /// The first image of a volume, shrunk to fit a `size` × `size` box.
    ///
    /// Sizes outside 1..=500 fall back to 200. Thumbnails are not cached.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn thumbnail(&self, archive: &Path, size: u32) -> Result<Page> {
        let cover: Arc<[u8]> = self.archives.extract_first_image(archive).await.or_archive()?.into();
        Ok(Page {
            data: render(cover, Transform::thumbnail(size)).await?.into(),
            content_type: OUTPUT_CONTENT_TYPE,
        })
    }

    /// Start reading ahead from `current`, unless a read-ahead of this
    /// archive is already running.
    ///
    /// Returns as soon as the job is registered; the pages themselves are
    /// read in the background, strictly in archive order.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn request_prefetch(&self, archive: &Path, current: &str) -> Result<PrefetchStart> {
        if !self.settings.prefetch_enabled {
            exn::bail!(ErrorKind::PrefetchDisabled);
        }
        let entries = self.archives.list_images(archive).await.or_archive()?;
        let current_index = entries
            .iter()
            .position(|entry| entry.name == current)
            .ok_or_raise(|| ErrorKind::CurrentEntryNotFound(current.to_string()))?;
        let snapshot = match self.jobs.begin(archive, entries.len()).await {
            Ok(snapshot) => snapshot,
            Err(running) => {
                tracing::debug!("Prefetch already in progress");
                return Ok(PrefetchStart::AlreadyRunning(running));
            },
        };
        let job = PrefetchJob::new(archive, entries, current_index, self.settings.prefetch_window);
        self.tasks.spawn(job.run(
            Arc::clone(&self.archives),
            Arc::clone(&self.cache),
            Arc::clone(&self.jobs),
            self.shutdown.clone(),
        ));
        Ok(PrefetchStart::Started { current_index, snapshot })
    }

    /// Progress of the most recent read-ahead of `archive`.
    pub async fn prefetch_status(&self, archive: &Path) -> Result<PrefetchSnapshot> {
        self.jobs.status(archive).await.ok_or_raise(|| ErrorKind::NoSuchJob)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Stop the sweeper and every read-ahead job, and wait for them to exit.
    ///
    /// Jobs stop between pages and are reported as no longer in progress.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::debug!("Library shut down");
    }
}

/// Resize on the blocking pool; decoding and resampling are CPU-bound.
async fn render(data: Arc<[u8]>, transform: Transform) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || transform.apply(&data))
        .await
        .or_raise(|| ErrorKind::Render)?
        .or_raise(|| ErrorKind::Render)
}
