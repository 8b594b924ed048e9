//! crates/litloom_core/src/ports.rs
//!
//! Defines the service contracts (traits) the state layer depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete storage backend, HTTP client and clock.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{AuthGrant, CatalogBook, Credentials, Quote, Registration};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., disk, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The remote side refused the request (bad credentials, validation).
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A flat string key/value space shared by every user of the process.
///
/// Isolation between users is a key-naming convention applied on top of this
/// trait, not something the backend enforces.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;

    /// Every physical key currently held.
    fn keys(&self) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> PortResult<AuthGrant>;

    async fn register(&self, registration: &Registration) -> PortResult<AuthGrant>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches the store catalog. Protected: the bearer token is attached when present.
    async fn fetch_books(&self, token: Option<&str>) -> PortResult<Vec<CatalogBook>>;
}

#[async_trait]
pub trait QuotesFeed: Send + Sync {
    async fn fetch_quotes(&self) -> PortResult<Vec<Quote>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The user's local calendar day.
    fn today(&self) -> NaiveDate;
}
