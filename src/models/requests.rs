//! Request DTOs for the gateway API
//!
//! Defines the query strings accepted by the read endpoints.

use std::collections::HashMap;

use serde::Deserialize;

use crate::facade::{FetchOptions, Params};

/// Query parameter that forces a refetch on any read endpoint.
pub const REFRESH_PARAM: &str = "refresh";

/// Query string for single-resource reads (`?refresh=true`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
}

impl RefreshQuery {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            force_refresh: self.refresh,
            ..FetchOptions::default()
        }
    }
}

/// Query string for list reads: every parameter except `refresh` is
/// forwarded to the backend and becomes part of the cache key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub params: Params,
    pub refresh: bool,
}

impl ListQuery {
    /// Splits raw query parameters into backend params and the refresh flag.
    pub fn from_map(mut raw: HashMap<String, String>) -> Self {
        let refresh = raw
            .remove(REFRESH_PARAM)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        Self {
            params: raw.into_iter().collect(),
            refresh,
        }
    }

    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            force_refresh: self.refresh,
            ..FetchOptions::default()
        }
    }
}
