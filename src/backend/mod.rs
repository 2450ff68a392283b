//! Backend Module
//!
//! The storefront REST backend as seen by the cache: opaque async operations
//! returning JSON payloads.

mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::facade::{Mutation, Params, Resource};

pub use rest::RestClient;

// == Resource Arguments ==
/// Arguments identifying which instance of a resource to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceArgs {
    None,
    Id(String),
    Params(Params),
}

impl ResourceArgs {
    pub fn id(id: impl Into<String>) -> Self {
        ResourceArgs::Id(id.into())
    }

    pub fn id_str(&self) -> Option<&str> {
        match self {
            ResourceArgs::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&Params> {
        match self {
            ResourceArgs::Params(params) => Some(params),
            _ => None,
        }
    }
}

// == Mutation Request ==
/// A write against the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub mutation: Mutation,
    /// Id of the record being changed, when there is one
    pub target: Option<String>,
    pub body: Option<Value>,
}

impl MutationRequest {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            mutation,
            target: None,
            body: None,
        }
    }

    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

// == Storefront Api Trait ==
/// Fetch and mutation operations the facade binds to cached resources.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Reads one resource.
    async fn fetch(&self, resource: Resource, args: &ResourceArgs) -> Result<Value>;

    /// Applies a mutation and returns the backend's response body.
    async fn mutate(&self, request: &MutationRequest) -> Result<Value>;
}
