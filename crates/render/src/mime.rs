use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type for a page, from its entry name's extension.
///
/// ```
/// use tankobon_render::content_type;
///
/// assert_eq!(content_type("ch01/p001.JPG"), "image/jpeg");
/// assert_eq!(content_type("ComicInfo.xml"), "application/octet-stream");
/// ```
pub fn content_type(name: &str) -> &'static str {
    let ext = Path::new(name).extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => OCTET_STREAM,
    }
}
