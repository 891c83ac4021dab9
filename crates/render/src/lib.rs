//! Page resizing for the request layer.
//!
//! The cache core only ever hands this crate opaque byte buffers; decoding,
//! resizing and re-encoding (always to JPEG) happen here. Work is CPU-bound
//! and synchronous: async callers should run it on a blocking thread.

pub mod error;
mod mime;
mod transform;

pub use crate::mime::{OCTET_STREAM, content_type};
pub use crate::transform::{DEFAULT_QUALITY, DEFAULT_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE, Transform};

/// MIME type of everything [`Transform::apply`] produces.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";
