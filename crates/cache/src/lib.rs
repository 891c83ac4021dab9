//! In-memory page cache.
//!
//! This crate provides the process-local cache that sits between readers and
//! the archives on disk. It is not a source of truth: nothing survives a
//! restart, and every entry can be re-extracted from its archive.
//!
//! # Architecture
//! - **Keys** ([`CacheKey`]) are BLAKE3 hashes of an (archive path, entry
//!   name) pair, so the cache never needs to know what a path means.
//! - **Entries** are shared byte blobs stamped with their write time. They
//!   leave the cache by reference-counted clone, never by move.
//! - **Expiry** happens three ways: a read that finds a stale entry removes
//!   it, a full cache evicts the oldest write to make room, and
//!   [`sweep_periodically`] clears everything stale on a timer.

mod key;
mod stats;
mod store;
mod sweep;

pub use crate::key::CacheKey;
pub use crate::stats::CacheStats;
pub use crate::store::ImageCache;
pub use crate::sweep::sweep_periodically;
