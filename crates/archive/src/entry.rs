//! Archive entry metadata.

use std::path::Path;

/// File extensions (lowercase, without the dot) treated as pages.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// One file inside an archive, as listed from the archive's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full path of the entry as stored in the archive index.
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    pub is_dir: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size, is_dir: false }
    }

    /// The final path component of the entry name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name)
    }
}

/// Whether an entry name has one of the recognised image extensions.
///
/// Comparison is case-insensitive; `PAGE.JPG` is an image.
///
/// ```
/// use tankobon_archive::is_image;
///
/// assert!(is_image("chapter 1/p001.jpg"));
/// assert!(is_image("cover.WEBP"));
/// assert!(!is_image("ComicInfo.xml"));
/// assert!(!is_image("jpg"));
/// ```
#[must_use]
pub fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|image| ext.eq_ignore_ascii_case(image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("p001.jpg", true)]
    #[case("p001.jpeg", true)]
    #[case("P001.PNG", true)]
    #[case("a/b/anim.gif", true)]
    #[case("page.webp", true)]
    #[case("page.bmp", false)]
    #[case("ComicInfo.xml", false)]
    #[case(".png", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(name), expected);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Entry::new("ch01/p001.jpg", 1).file_name(), "p001.jpg");
        assert_eq!(Entry::new("p001.jpg", 1).file_name(), "p001.jpg");
    }
}
