//! Cache keys for archive entries.

use std::fmt;
use std::path::Path;

/// Separates the archive path from the entry name in the hashed input. A NUL
/// byte can't appear in either, so no two (path, entry) pairs share an input.
const SEPARATOR: [u8; 1] = [0x00];

/// Opaque, fixed-width identifier for one entry of one archive.
///
/// A BLAKE3 hash of `archive ‖ NUL ‖ entry`. The key is stable across
/// process restarts, so it can be correlated between log lines of different
/// runs.
///
/// ```
/// use tankobon_cache::CacheKey;
///
/// let a = CacheKey::new("/manga/vol1.cbz", "p001.jpg");
/// assert_eq!(a, CacheKey::new("/manga/vol1.cbz", "p001.jpg"));
/// assert_ne!(a, CacheKey::new("/manga/vol1.cbz", "p002.jpg"));
/// assert_eq!(a.to_string().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    pub fn new(archive: impl AsRef<Path>, entry: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(archive.as_ref().as_os_str().as_encoded_bytes());
        hasher.update(&SEPARATOR);
        hasher.update(entry.as_bytes());
        Self(hasher.finalize())
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.to_hex().as_str())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({self})")
    }
}
