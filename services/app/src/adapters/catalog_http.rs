//! services/app/src/adapters/catalog_http.rs
//!
//! This module contains the adapter for the book catalog endpoint.
//! It implements the `CatalogService` port from the `core` crate.

use async_trait::async_trait;
use litloom_core::domain::CatalogBook;
use litloom_core::ports::{CatalogService, PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

/// The catalog is served either as a bare array or wrapped in `{ "books": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    List(Vec<CatalogBook>),
    Wrapped { books: Vec<CatalogBook> },
}

impl CatalogBody {
    fn into_books(self) -> Vec<CatalogBook> {
        match self {
            CatalogBody::List(books) | CatalogBody::Wrapped { books } => books,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CatalogService` over plain HTTP GET.
#[derive(Clone)]
pub struct HttpCatalogAdapter {
    client: Client,
    url: String,
}

impl HttpCatalogAdapter {
    /// Creates a new `HttpCatalogAdapter`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

fn decode_catalog(status: StatusCode, body: &str) -> PortResult<Vec<CatalogBook>> {
    match status {
        StatusCode::UNAUTHORIZED => return Err(PortError::Unauthorized),
        StatusCode::NOT_FOUND => return Err(PortError::NotFound("catalog".to_string())),
        s if !s.is_success() => return Err(PortError::Unexpected(format!("Catalog returned {}", s))),
        _ => {}
    }
    serde_json::from_str::<CatalogBody>(body)
        .map(CatalogBody::into_books)
        .map_err(|e| PortError::Unexpected(format!("Malformed catalog: {}", e)))
}

//=========================================================================================
// `CatalogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogService for HttpCatalogAdapter {
    async fn fetch_books(&self, token: Option<&str>) -> PortResult<Vec<CatalogBook>> {
        debug!("GET {}", self.url);
        let mut request = self.client.get(&self.url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            warn!("Catalog request failed: {}", e);
            PortError::Unexpected(e.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        decode_catalog(status, &body)
    }
}
