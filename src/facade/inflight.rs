//! In-flight request map.
//!
//! Concurrent readers of the same cold key share one fetch instead of each
//! issuing their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::error::ApiError;

/// A fetch that any number of callers can await.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

#[derive(Clone, Default)]
pub struct InFlight {
    requests: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SharedFetch>> {
        // The map holds no invariant a panicking holder could break
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the fetch already running for `key`, or registers the one
    /// built by `start`.
    ///
    /// The second element is true when `start` was called.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<Value, ApiError>>,
    {
        let mut requests = self.lock();
        if let Some(existing) = requests.get(key) {
            return (existing.clone(), false);
        }

        let fetch = start().shared();
        requests.insert(key.to_string(), fetch.clone());
        (fetch, true)
    }

    /// Forgets the fetch for `key` once it has settled.
    pub fn finish(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("requests", &self.len())
            .finish()
    }
}
