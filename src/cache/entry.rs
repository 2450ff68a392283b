//! Cache Entry Module
//!
//! Defines the unit stored in either tier and its persisted form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Logical cache key
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds), used for eviction ordering
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Release identifier the entry was written under
    pub schema_version: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_ms` after `now_ms`.
    pub fn new(
        key: impl Into<String>,
        value: Value,
        ttl_ms: u64,
        now_ms: u64,
        schema_version: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            schema_version: schema_version.into(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry read at exactly `expires_at` is still fresh; it expires once
    /// the clock moves past that instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Returns true if the entry was written under `version`.
    pub fn matches_version(&self, version: &str) -> bool {
        self.schema_version == version
    }

    // == Persisted Form ==
    /// Converts the entry into the record written to durable storage.
    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            data: self.value.clone(),
            expiry: self.expires_at,
            timestamp: self.created_at,
            version: self.schema_version.clone(),
        }
    }

    /// Rebuilds an entry from a durable record stored under `key`.
    pub fn from_record(key: impl Into<String>, record: PersistedRecord) -> Self {
        Self {
            key: key.into(),
            value: record.data,
            created_at: record.timestamp,
            expires_at: record.expiry,
            schema_version: record.version,
        }
    }
}

// == Persisted Record ==
/// Durable tier layout: `{ data, expiry, timestamp, version }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// The stored payload
    pub data: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expiry: u64,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Release identifier the record was written under
    pub version: String,
}
