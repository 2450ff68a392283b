//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::facade::PreloadStatus;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Entries in the volatile tier
    pub memory_entries: usize,
    /// Entries in the durable tier
    pub durable_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
    pub promotions: u64,
    pub evictions: u64,
    pub durable_write_failures: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Fetches currently shared between callers
    pub in_flight: usize,
    /// Release identifier durable entries are checked against
    pub cache_version: String,
    pub preload: PreloadStatus,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(
        stats: CacheStats,
        in_flight: usize,
        cache_version: impl Into<String>,
        preload: PreloadStatus,
    ) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            memory_entries: stats.memory_entries,
            durable_entries: stats.durable_entries,
            hits: stats.hits,
            misses: stats.misses,
            stale_hits: stats.stale_hits,
            promotions: stats.promotions,
            evictions: stats.evictions,
            durable_write_failures: stats.durable_write_failures,
            in_flight,
            cache_version: cache_version.into(),
            preload,
        }
    }
}

/// Response body for the invalidation endpoints (DELETE /cache/...)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// Entries removed across tiers, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl InvalidateResponse {
    pub fn key(key: &str) -> Self {
        Self {
            message: format!("Key '{}' invalidated", key),
            removed: None,
        }
    }

    pub fn pattern(pattern: &str, removed: usize) -> Self {
        Self {
            message: format!("Pattern '{}' invalidated", pattern),
            removed: Some(removed),
        }
    }

    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            removed: None,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(stats, 0, "1.0.0", PreloadStatus::Pending);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_serialize() {
        let resp = StatsResponse::new(CacheStats::default(), 2, "1.0.0", PreloadStatus::Completed);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["in_flight"], 2);
        assert_eq!(json["cache_version"], "1.0.0");
        assert_eq!(json["preload"]["state"], "completed");
    }

    #[test]
    fn test_invalidate_response_serialize() {
        let json = serde_json::to_string(&InvalidateResponse::key("api_settings")).unwrap();
        assert!(json.contains("api_settings"));
        assert!(!json.contains("removed"));

        let json = serde_json::to_value(InvalidateResponse::pattern("products", 3)).unwrap();
        assert_eq!(json["removed"], 3);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
