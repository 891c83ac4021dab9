//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A configuration file: YAML by default, TOML or JSON by extension. When
//!    no path is given, `config.yaml` in the platform configuration directory
//!    is used if it exists.
//! 3. Environment variables prefixed `TANKOBON_`, with `__` separating nested
//!    keys (`TANKOBON_CACHE__MAX_SIZE=1000`). `MANGA_PATH` is also accepted
//!    for `library.source_path`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "TANKOBON_";
pub const CONFIG_FILE: &str = "config.yaml";
const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory that relative archive paths are resolved against.
    pub source_path: PathBuf,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self { source_path: PathBuf::from(".") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached pages.
    pub max_size: usize,
    pub ttl_minutes: u64,
    pub cleanup_interval_minutes: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 500,
            ttl_minutes: 60,
            cleanup_interval_minutes: 10,
        }
    }
}
impl CacheConfig {
    /// Zero is rejected by [`Config::validate`]; an unvalidated zero is
    /// treated as one.
    pub fn max_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(SECONDS_PER_MINUTE))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.saturating_mul(SECONDS_PER_MINUTE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// How many pages after the current one to read ahead.
    pub count: usize,
    pub enabled: bool,
}
impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { count: 100, enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// JPEG quality (1-100) of resized pages.
    pub image_quality: u8,
    pub max_image_width: u32,
    pub max_image_height: u32,
}
impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            image_quality: 85,
            max_image_width: 1920,
            max_image_height: 1080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub level: String,
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load and validate configuration.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            exn::bail!(ErrorKind::Load);
        }
        let config: Self = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(source = %config.library.source_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// The merged configuration sources, before extraction.
    ///
    /// Missing files are skipped here; [`load`](Self::load) is what rejects
    /// a missing explicit path.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => figment = figment.merge(Self::file_provider(path)),
            None => {
                if let Some(path) = Self::default_path() {
                    figment = figment.merge(Self::file_provider(&path));
                }
            },
        }
        figment
            .merge(Env::raw().only(&["MANGA_PATH"]).map(|_| "library.source_path".into()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `config.yaml` in the platform configuration directory, if the
    /// platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tankobon").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    fn file_provider(path: &Path) -> Figment {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Figment::from(Toml::file(path)),
            Some("json") => Figment::from(Json::file(path)),
            _ => Figment::from(Yaml::file(path)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.max_size == 0 {
            exn::bail!(ErrorKind::Invalid("cache.max_size"));
        }
        if self.cache.ttl_minutes == 0 {
            exn::bail!(ErrorKind::Invalid("cache.ttl_minutes"));
        }
        if self.cache.cleanup_interval_minutes == 0 {
            exn::bail!(ErrorKind::Invalid("cache.cleanup_interval_minutes"));
        }
        if !(1..=100).contains(&self.performance.image_quality) {
            exn::bail!(ErrorKind::Invalid("performance.image_quality"));
        }
        Ok(())
    }

    /// Resolve an archive path against `library.source_path`. Absolute paths
    /// are returned unchanged. No traversal checks are made.
    pub fn resolve(&self, archive: impl AsRef<Path>) -> PathBuf {
        self.library.source_path.join(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.max_size, 500);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.cleanup_interval(), Duration::from_secs(600));
        assert_eq!(config.prefetch, PrefetchConfig { count: 100, enabled: true });
        assert_eq!(config.performance.image_quality, 85);
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let file = file_with(".yaml", "cache:\n  max_size: 42\nprefetch:\n  count: 5\n");
        let config: Config = Config::figment(Some(file.path())).extract().unwrap();
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.cache.ttl_minutes, 60);
        assert_eq!(config.prefetch.count, 5);
        assert!(config.prefetch.enabled);
    }

    #[test]
    fn test_toml_by_extension() {
        let file = file_with(".toml", "[library]\nsource_path = \"/srv/manga\"\n[logging]\nlevel = \"debug\"\n");
        let config: Config = Config::figment(Some(file.path())).extract().unwrap();
        assert_eq!(config.library.source_path, PathBuf::from("/srv/manga"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let err = Config::load(Some(Path::new("/definitely/not/here/config.yaml"))).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path())).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn test_missing_file_is_skipped_by_figment() {
        let config: Config = Config::figment(Some(Path::new("/definitely/not/here/config.yaml"))).extract().unwrap();
        assert_eq!(config.cache.max_size, 500);
    }

    #[test]
    fn test_load_existing_file() {
        let file = file_with(".json", r#"{"prefetch": {"enabled": false}}"#);
        let config = Config::load(Some(file.path())).unwrap();
        assert!(!config.prefetch.enabled);
        assert_eq!(config.prefetch.count, 100);
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "cache:\n  max_size: 42\n  ttl_minutes: 5\n")?;
            jail.set_env("TANKOBON_CACHE__MAX_SIZE", "7");
            jail.set_env("MANGA_PATH", "/srv/comics");
            let config = Config::load(Some(Path::new("config.yaml"))).unwrap();
            assert_eq!(config.cache.max_size, 7);
            assert_eq!(config.cache.ttl_minutes, 5);
            assert_eq!(config.library.source_path, PathBuf::from("/srv/comics"));
            Ok(())
        });
    }

    #[rstest]
    #[case("cache:\n  max_size: 0\n", "cache.max_size")]
    #[case("cache:\n  ttl_minutes: 0\n", "cache.ttl_minutes")]
    #[case("cache:\n  cleanup_interval_minutes: 0\n", "cache.cleanup_interval_minutes")]
    #[case("performance:\n  image_quality: 0\n", "performance.image_quality")]
    #[case("performance:\n  image_quality: 101\n", "performance.image_quality")]
    fn test_validation(#[case] yaml: &str, #[case] field: &'static str) {
        let file = file_with(".yaml", yaml);
        let err = Config::load(Some(file.path())).unwrap_err();
        assert_eq!(*err, ErrorKind::Invalid(field));
    }

    #[test]
    fn test_resolve() {
        let mut config = Config::default();
        config.library.source_path = PathBuf::from("/srv/manga");
        assert_eq!(config.resolve("Series/vol1.cbz"), PathBuf::from("/srv/manga/Series/vol1.cbz"));
        assert_eq!(config.resolve("/elsewhere/vol1.cbz"), PathBuf::from("/elsewhere/vol1.cbz"));
    }
}
