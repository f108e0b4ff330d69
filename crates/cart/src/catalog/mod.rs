//! Catalog API client.
//!
//! The catalog exposes two read-only endpoints consumed by the cart:
//! `GET /products/{id}` for product detail and `GET /stock/{id}` for the
//! current stock level. No other endpoints are used.
//!
//! [`ProductCatalog`] is the seam the cart store depends on; the production
//! implementation is [`CatalogClient`] over `reqwest`. Reads carry no
//! timeout and no retry: a hung read suspends the calling operation.

pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use rocket_shoes_core::ProductId;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::CartConfig;

pub use types::{Product, StockRecord};

/// Errors that can occur when querying the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Product or stock record not found.
    #[error("Not found: product {0}")]
    NotFound(ProductId),

    /// Catalog returned a non-success status.
    #[error("Unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

/// Read access to product detail and stock levels.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch product detail for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Fetch the current stock level for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no stock record exists.
    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError>;
}

/// Client for the catalog API.
///
/// Cheaply cloneable via `Arc`. Responses are never cached: the cart must
/// observe the stock level at mutation time.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: url::Url,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_base_url.clone(),
            }),
        }
    }

    /// Execute a GET request against a catalog endpoint.
    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: ProductId,
    ) -> Result<T, CatalogError> {
        // Url::join treats the base as a directory only with a trailing
        // slash, so build the path by hand.
        let url = format!(
            "{}/{resource}/{id}",
            self.inner.base_url.as_str().trim_end_matches('/')
        );
        debug!(%url, "catalog request");

        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id));
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ProductCatalog for CatalogClient {
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.get("products", id).await
    }

    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError> {
        self.get("stock", id).await
    }
}
