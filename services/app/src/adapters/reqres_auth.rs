//! services/app/src/adapters/reqres_auth.rs
//!
//! This module contains the adapter for the demo authentication API.
//! It implements the `AuthGateway` port from the `core` crate.

use async_trait::async_trait;
use litloom_core::domain::{AuthGrant, Credentials, Registration};
use litloom_core::ports::{AuthGateway, PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";

/// Success body of `/login` and `/register`. Login has no `id`.
#[derive(Debug, Deserialize)]
struct GrantBody {
    token: String,
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AuthGateway` against a ReqRes-compatible API.
#[derive(Clone)]
pub struct ReqresAuthAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReqresAuthAdapter {
    /// Creates a new `ReqresAuthAdapter`.
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn post<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> PortResult<AuthGrant> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        decode_grant(status, &body)
    }
}

/// Maps a response to a grant or the matching port error.
fn decode_grant(status: StatusCode, body: &str) -> PortResult<AuthGrant> {
    if status.is_success() {
        let grant: GrantBody = serde_json::from_str(body)
            .map_err(|e| PortError::Unexpected(format!("Malformed auth response: {}", e)))?;
        if grant.token.is_empty() {
            return Err(PortError::Unexpected("Auth response carried no token".to_string()));
        }
        return Ok(AuthGrant {
            token: grant.token,
            id: grant.id,
        });
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());
    if status.is_client_error() {
        Err(PortError::Rejected(message))
    } else {
        Err(PortError::Unexpected(message))
    }
}

//=========================================================================================
// `AuthGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthGateway for ReqresAuthAdapter {
    async fn login(&self, credentials: &Credentials) -> PortResult<AuthGrant> {
        self.post("login", credentials).await
    }

    async fn register(&self, registration: &Registration) -> PortResult<AuthGrant> {
        self.post("register", registration).await
    }
}
