//! services/app/src/context.rs
//!
//! Wires the concrete adapters into an application context.

use litloom_core::app::{AppContext, Services};
use std::sync::Arc;
use tracing::info;

use crate::adapters::{
    http_client, FileStore, HttpCatalogAdapter, HttpQuotesAdapter, ReqresAuthAdapter, SystemClock,
};
use crate::config::Config;
use crate::error::AppError;

/// Opens both stores under the data directory and builds the HTTP adapters.
pub fn build_context(config: &Config) -> Result<AppContext, AppError> {
    let backend = Arc::new(FileStore::open(config.store_path())?);
    let intent_backend = Arc::new(FileStore::open(config.intent_path())?);
    info!("Using data file {}", backend.path().display());

    let client = http_client(config.http_timeout)?;
    let auth = Arc::new(ReqresAuthAdapter::new(
        client.clone(),
        config.auth_base_url.clone(),
        config.reqres_api_key.clone(),
    ));
    let catalog = Arc::new(HttpCatalogAdapter::new(client.clone(), config.catalog_url.clone()));
    let quotes = Arc::new(HttpQuotesAdapter::new(client, config.quotes_url.clone()));

    Ok(AppContext::new(Services {
        backend,
        intent_backend,
        auth,
        catalog,
        quotes,
        clock: Arc::new(SystemClock),
        intent_ttl: config.intent_ttl,
    }))
}
