//! Cache key construction.
//!
//! Keys look like `<namespace>_<resource>` or `<namespace>_<resource>_<params>`.
//! Parameter maps are encoded with sorted keys so that semantically equal
//! arguments always produce the same key. Names and values are
//! percent-encoded, so distinct maps never produce the same key.

use std::collections::BTreeMap;
use std::fmt;

/// Namespace shared by every key the facade builds.
pub const KEY_NAMESPACE: &str = "api";

/// Query parameters for list and search accessors.
pub type Params = BTreeMap<String, String>;

/// A fully built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a resource without parameters, e.g. `api_settings`.
    pub fn resource(resource: &str) -> Self {
        Self(format!("{}_{}", KEY_NAMESPACE, resource))
    }

    /// Key for a resource addressed by a single id, e.g. `api_product_64f1`.
    pub fn with_id(resource: &str, id: &str) -> Self {
        Self(format!("{}_{}_{}", KEY_NAMESPACE, resource, id))
    }

    /// Key for a resource addressed by query parameters.
    ///
    /// Empty values are dropped; no remaining parameters yields the bare
    /// resource key.
    pub fn with_params(resource: &str, params: &Params) -> Self {
        let encoded = encode_params(params);
        if encoded.is_empty() {
            Self::resource(resource)
        } else {
            Self::with_id(resource, &encoded)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sorted `k=v&k=v` encoding. `BTreeMap` iteration order gives the sort.
pub fn encode_params(params: &Params) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
