//! REST client for the storefront backend.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{MutationRequest, ResourceArgs, StorefrontApi};
use crate::error::{ApiError, Result};
use crate::facade::{Mutation, Resource};

// == Rest Client ==
/// `StorefrontApi` over HTTP + JSON.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestClient {
    /// Creates a client for the backend rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sends `token` as a bearer credential on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Path a resource is read from.
pub(crate) fn resource_path(resource: Resource, args: &ResourceArgs) -> Result<String> {
    let path = match resource {
        Resource::Products => "/products".to_string(),
        Resource::Product => format!("/products/{}", required_id(resource.name(), args.id_str())?),
        Resource::Categories => "/categories".to_string(),
        Resource::Settings => "/settings".to_string(),
        Resource::UserProfile => "/users/me".to_string(),
        Resource::Wishlist => "/users/me/wishlist".to_string(),
        Resource::UserOrders => "/orders/my".to_string(),
        Resource::Search => "/products/search".to_string(),
        Resource::BestSelling => "/products/best-selling".to_string(),
        Resource::Timer => "/settings/timer".to_string(),
        Resource::BlackFriday => "/settings/black-friday".to_string(),
        Resource::UserAddresses => "/users/me/addresses".to_string(),
        Resource::PromoValidation => "/promo-codes/validate".to_string(),
    };
    Ok(path)
}

/// Method and path a mutation is sent to.
pub(crate) fn mutation_route(request: &MutationRequest) -> Result<(Method, String)> {
    let name = format!("{:?}", request.mutation);
    let id = || required_id(&name, request.target.as_deref());

    let route = match request.mutation {
        Mutation::CreateProduct => (Method::POST, "/products".to_string()),
        Mutation::UpdateProduct => (Method::PUT, format!("/products/{}", id()?)),
        Mutation::DeleteProduct => (Method::DELETE, format!("/products/{}", id()?)),
        Mutation::ToggleProduct => (Method::PATCH, format!("/products/{}/toggle", id()?)),
        Mutation::CreateCategory => (Method::POST, "/categories".to_string()),
        Mutation::UpdateCategory => (Method::PUT, format!("/categories/{}", id()?)),
        Mutation::DeleteCategory => (Method::DELETE, format!("/categories/{}", id()?)),
        Mutation::MergeCategories => (Method::POST, "/categories/merge".to_string()),
        Mutation::UpdateSettings => (Method::PUT, "/settings".to_string()),
        Mutation::UpdateHero => (Method::PUT, "/settings/hero".to_string()),
        Mutation::AddToWishlist => (Method::POST, format!("/users/me/wishlist/{}", id()?)),
        Mutation::RemoveFromWishlist => (Method::DELETE, format!("/users/me/wishlist/{}", id()?)),
        Mutation::AddAddress => (Method::POST, "/users/me/addresses".to_string()),
        Mutation::UpdateAddress => (Method::PUT, format!("/users/me/addresses/{}", id()?)),
        Mutation::DeleteAddress => (Method::DELETE, format!("/users/me/addresses/{}", id()?)),
        Mutation::SetDefaultAddress => (
            Method::PATCH,
            format!("/users/me/addresses/{}/default", id()?),
        ),
        Mutation::UpdateProfile => (Method::PUT, "/users/me".to_string()),
    };
    Ok(route)
}

/// The target id as a single percent-encoded path segment.
///
/// `.` and `..` are rejected: URL parsing resolves them even when encoded.
fn required_id(operation: &str, id: Option<&str>) -> Result<String> {
    let id = id.ok_or_else(|| ApiError::Internal(format!("{} requires a target id", operation)))?;
    if id.is_empty() || id == "." || id == ".." {
        return Err(ApiError::InvalidRequest(format!(
            "{} target id '{}' is not a valid path segment",
            operation, id
        )));
    }
    Ok(urlencoding::encode(id).into_owned())
}

#[async_trait]
impl StorefrontApi for RestClient {
    async fn fetch(&self, resource: Resource, args: &ResourceArgs) -> Result<Value> {
        let path = resource_path(resource, args)?;
        debug!("GET {}", path);

        let mut builder = self.request(Method::GET, &path);
        if let Some(params) = args.params() {
            builder = builder.query(params);
        }
        self.send(builder).await
    }

    async fn mutate(&self, request: &MutationRequest) -> Result<Value> {
        let (method, path) = mutation_route(request)?;
        debug!("{} {}", method, path);

        let mut builder = self.request(method, &path);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }
}
