pub mod catalog_http;
pub mod clock;
pub mod file_store;
pub mod quotes_http;
pub mod reqres_auth;

pub use catalog_http::HttpCatalogAdapter;
pub use clock::SystemClock;
pub use file_store::FileStore;
pub use quotes_http::HttpQuotesAdapter;
pub use reqres_auth::ReqresAuthAdapter;

use std::time::Duration;

/// One HTTP client shared by every remote adapter.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("litloom/", env!("CARGO_PKG_VERSION")))
        .build()
}
