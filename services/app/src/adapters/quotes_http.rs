//! services/app/src/adapters/quotes_http.rs
//!
//! This module contains the adapter for the DummyJSON-style quotes feed.
//! It implements the `QuotesFeed` port from the `core` crate.

use async_trait::async_trait;
use litloom_core::domain::Quote;
use litloom_core::ports::{PortError, PortResult, QuotesFeed};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct FeedBody {
    #[serde(default)]
    quotes: Value,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

/// An adapter that implements `QuotesFeed` over plain HTTP GET.
#[derive(Clone)]
pub struct HttpQuotesAdapter {
    client: Client,
    url: String,
}

impl HttpQuotesAdapter {
    /// Creates a new `HttpQuotesAdapter`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// `{ quotes: [{ quote, author }] }`. A body without a `quotes` array is an
/// empty feed; entries without text are skipped.
fn decode_feed(body: &str) -> PortResult<Vec<Quote>> {
    let body: FeedBody = serde_json::from_str(body)
        .map_err(|e| PortError::Unexpected(format!("Malformed quotes feed: {}", e)))?;
    let Value::Array(entries) = body.quotes else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<FeedEntry>(entry).ok())
        .filter_map(|entry| {
            let text = entry.quote?.trim().to_string();
            (!text.is_empty()).then(|| Quote {
                text,
                author: entry.author.filter(|a| !a.trim().is_empty()),
            })
        })
        .collect())
}

#[async_trait]
impl QuotesFeed for HttpQuotesAdapter {
    async fn fetch_quotes(&self) -> PortResult<Vec<Quote>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        decode_feed(&body)
    }
}
