use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::time::Duration;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Point-in-time view of an [`ImageCache`](crate::ImageCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored, including stale ones not yet swept.
    pub entries: usize,
    pub max_size: usize,
    /// Sum of the stored blob lengths.
    pub total_bytes: u64,
    /// Entries past their TTL that no read or sweep has removed yet.
    pub expired_entries: usize,
    pub ttl: Duration,
    /// Reads that returned an entry.
    pub hits: u64,
    /// Reads that found nothing, or found an expired entry.
    pub misses: u64,
}

impl CacheStats {
    /// Percentage of reads served from the cache; 0 before the first read.
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            return 0.0;
        }
        self.hits as f64 / reads as f64 * 100.0
    }

    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MEGABYTE
    }
}

// Written out by hand so the derived figures are part of the report and the
// TTL is flat seconds.
impl Serialize for CacheStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CacheStats", 9)?;
        state.serialize_field("entries", &self.entries)?;
        state.serialize_field("max_size", &self.max_size)?;
        state.serialize_field("total_bytes", &self.total_bytes)?;
        state.serialize_field("total_megabytes", &self.total_megabytes())?;
        state.serialize_field("expired_entries", &self.expired_entries)?;
        state.serialize_field("ttl_seconds", &self.ttl.as_secs())?;
        state.serialize_field("hits", &self.hits)?;
        state.serialize_field("misses", &self.misses)?;
        state.serialize_field("hit_ratio", &self.hit_ratio())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stats(hits: u64, misses: u64) -> CacheStats {
        CacheStats {
            entries: 0,
            max_size: 500,
            total_bytes: 3 * 1024 * 1024,
            expired_entries: 0,
            ttl: Duration::from_secs(3600),
            hits,
            misses,
        }
    }

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(1, 0, 100.0)]
    #[case(1, 3, 25.0)]
    #[case(0, 7, 0.0)]
    fn test_hit_ratio(#[case] hits: u64, #[case] misses: u64, #[case] expected: f64) {
        assert!((stats(hits, misses).hit_ratio() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_total_megabytes() {
        assert!((stats(0, 0).total_megabytes() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(stats(2, 1)).unwrap();
        assert_eq!(json["max_size"], 500);
        assert_eq!(json["hits"], 2);
        assert_eq!(json["ttl_seconds"], 3600);
        assert_eq!(json["total_bytes"], 3 * 1024 * 1024);
        assert_eq!(json["total_megabytes"], 3.0);
        assert!((json["hit_ratio"].as_f64().unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert!(json.get("ttl").is_none());
    }
}
