//! Periodic removal of expired entries.

use crate::ImageCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// Shortest accepted sweep period; a zero period would spin.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Sweep `cache` every `period` until `shutdown` is cancelled.
///
/// The first sweep happens one period after the call, not immediately. If a
/// sweep is delayed (a writer holding the lock, a busy runtime) the next one
/// is scheduled a full period after it rather than bunched up.
///
/// ```no_run
/// use std::num::NonZeroUsize;
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tankobon_cache::{ImageCache, sweep_periodically};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let cache = Arc::new(ImageCache::new(NonZeroUsize::new(500).unwrap(), Duration::from_secs(3600)));
/// let shutdown = CancellationToken::new();
/// let sweeper = tokio::spawn(sweep_periodically(cache, Duration::from_secs(600), shutdown.clone()));
/// // ...
/// shutdown.cancel();
/// sweeper.await.unwrap();
/// # }
/// ```
pub async fn sweep_periodically(cache: Arc<ImageCache>, period: Duration, shutdown: CancellationToken) {
    let period = period.max(MIN_PERIOD);
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(period = ?period, "Cache sweeper started");
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticks.tick() => {
                let removed = cache.sweep().await;
                tracing::debug!(removed, "Cache cleanup completed");
            },
        }
    }
    tracing::debug!("Cache sweeper stopped");
}
