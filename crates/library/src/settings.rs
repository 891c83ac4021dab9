use std::num::NonZeroUsize;
use std::time::Duration;
use tankobon_config::Config;

/// Runtime knobs of a [`Library`](crate::Library).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cache_size: NonZeroUsize,
    pub cache_ttl: Duration,
    /// How often expired pages are swept out of the cache.
    pub sweep_interval: Duration,
    /// Pages read ahead of the current one.
    pub prefetch_window: usize,
    pub prefetch_enabled: bool,
    /// Upper bound for resize requests.
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            cache_size: config.cache.max_size(),
            cache_ttl: config.cache.ttl(),
            sweep_interval: config.cache.cleanup_interval(),
            prefetch_window: config.prefetch.count,
            prefetch_enabled: config.prefetch.enabled,
            max_width: config.performance.max_image_width,
            max_height: config.performance.max_image_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.cache.max_size = 3;
        config.prefetch.count = 2;
        config.prefetch.enabled = false;
        let settings = Settings::from(&config);
        assert_eq!(settings.cache_size.get(), 3);
        assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
        assert_eq!(settings.sweep_interval, Duration::from_secs(600));
        assert_eq!(settings.prefetch_window, 2);
        assert!(!settings.prefetch_enabled);
        assert_eq!((settings.max_width, settings.max_height), (1920, 1080));
    }
}
