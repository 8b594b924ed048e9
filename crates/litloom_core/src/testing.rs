//! crates/litloom_core/src/testing.rs
//!
//! Test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{AuthGrant, AuthSession, CatalogBook, Credentials, Quote, Registration, User};
use crate::ports::{AuthGateway, CatalogService, Clock, PortError, PortResult, QuotesFeed};
use crate::session::SessionStore;
use crate::storage::{MemoryStore, UserStorage};

//=========================================================================================
// Clock
//=========================================================================================

/// A clock that only moves when told to. `today()` is the UTC date.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon UTC on the given day.
    pub fn on(year: i32, month: u32, day: u32) -> Self {
        Self::at(Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

//=========================================================================================
// Auth Gateway
//=========================================================================================

pub struct ScriptedAuth {
    outcome: Result<AuthGrant, PortError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAuth {
    pub fn accepting(token: &str) -> Self {
        Self {
            outcome: Ok(AuthGrant {
                token: token.to_string(),
                id: None,
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            outcome: Err(PortError::Rejected(message.to_string())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        if let Ok(grant) = &mut self.outcome {
            grant.id = Some(id);
        }
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl AuthGateway for ScriptedAuth {
    async fn login(&self, _credentials: &Credentials) -> PortResult<AuthGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    async fn register(&self, _registration: &Registration) -> PortResult<AuthGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

//=========================================================================================
// Catalog & Quotes
//=========================================================================================

pub struct ScriptedCatalog {
    pub outcome: PortResult<Vec<CatalogBook>>,
    pub seen_tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedCatalog {
    pub fn returning(books: Vec<CatalogBook>) -> Self {
        Self {
            outcome: Ok(books),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: PortError) -> Self {
        Self {
            outcome: Err(error),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CatalogService for ScriptedCatalog {
    async fn fetch_books(&self, token: Option<&str>) -> PortResult<Vec<CatalogBook>> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.map(str::to_string));
        self.outcome.clone()
    }
}

pub struct ScriptedQuotes(pub PortResult<Vec<Quote>>);

impl ScriptedQuotes {
    pub fn texts(texts: &[&str]) -> Self {
        Self(Ok(texts
            .iter()
            .map(|t| Quote {
                text: t.to_string(),
                author: None,
            })
            .collect()))
    }
}

#[async_trait]
impl QuotesFeed for ScriptedQuotes {
    async fn fetch_quotes(&self) -> PortResult<Vec<Quote>> {
        self.0.clone()
    }
}

//=========================================================================================
// Harness
//=========================================================================================

/// A session store and keyed storage over an in-memory backend.
pub struct Harness {
    pub backend: Arc<MemoryStore>,
    pub session: Arc<SessionStore>,
    pub storage: Arc<UserStorage>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_clock(FixedClock::on(2026, 10, 19))
    }

    pub fn with_clock(clock: FixedClock) -> Self {
        let backend = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new(
            backend.clone(),
            Arc::new(ScriptedAuth::accepting("test-token")),
        ));
        let storage = Arc::new(UserStorage::new(backend.clone(), session.clone()));
        Self {
            backend,
            session,
            storage,
            clock: Arc::new(clock),
        }
    }

    pub fn sign_in(&self, email: &str) {
        self.session.establish(AuthSession {
            token: format!("token-for-{email}"),
            user: User::new(email),
        });
    }

    pub fn sign_out(&self) {
        self.session.logout();
    }
}
