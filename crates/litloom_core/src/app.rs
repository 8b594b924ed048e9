//! crates/litloom_core/src/app.rs
//!
//! The application context. It is constructed once per process from a
//! bundle of port implementations, owns every store, and implements the
//! flows that cross store boundaries: authentication-gated actions with
//! deferred replay, sign-in landing, forced logout on expired tokens and
//! the navigation guards.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{CatalogBook, IntentAction, LibraryBook, User};
use crate::intent::DeferredIntentStore;
use crate::ports::{AuthGateway, CatalogService, Clock, KeyValueStore, PortError, PortResult, QuotesFeed};
use crate::quotes::QuoteRotator;
use crate::session::{AuthError, SessionStore};
use crate::storage::UserStorage;
use crate::stores::{CartStore, GoalsStore, LibraryStore, ProfileStore, TrackerStore};

/// Port implementations the context is assembled from.
pub struct Services {
    /// Durable key/value space shared by every user namespace.
    pub backend: Arc<dyn KeyValueStore>,
    /// Short-lived space for deferred intents.
    pub intent_backend: Arc<dyn KeyValueStore>,
    pub auth: Arc<dyn AuthGateway>,
    pub catalog: Arc<dyn CatalogService>,
    pub quotes: Arc<dyn QuotesFeed>,
    pub clock: Arc<dyn Clock>,
    pub intent_ttl: chrono::Duration,
}

//=========================================================================================
// Routes
//=========================================================================================

/// Why the user was sent back to the login view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    Expired,
    Logout,
}

impl SessionNotice {
    fn as_str(&self) -> &'static str {
        match self {
            SessionNotice::Expired => "expired",
            SessionNotice::Logout => "logout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Cart,
    Library,
    Profile,
    Login {
        redirect_url: Option<String>,
        session: Option<SessionNotice>,
    },
    Other(String),
}

impl Route {
    pub fn login_for(redirect_url: impl Into<String>) -> Self {
        Route::Login {
            redirect_url: Some(redirect_url.into()),
            session: None,
        }
    }

    pub fn login_with_notice(session: SessionNotice) -> Self {
        Route::Login {
            redirect_url: None,
            session: Some(session),
        }
    }

    /// Parses a path such as `/cart` or `/login?redirectUrl=/library`.
    /// Anything unrecognised is kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        match path.trim_end_matches('/') {
            "/home" => Route::Home,
            "/cart" => Route::Cart,
            "/library" => Route::Library,
            "/profile" => Route::Profile,
            "/login" => {
                let mut redirect_url = None;
                let mut session = None;
                for pair in query.split('&') {
                    match pair.split_once('=') {
                        Some(("redirectUrl", v)) if !v.is_empty() => {
                            redirect_url = Some(v.to_string())
                        }
                        Some(("session", "expired")) => session = Some(SessionNotice::Expired),
                        Some(("session", "logout")) => session = Some(SessionNotice::Logout),
                        _ => {}
                    }
                }
                Route::Login {
                    redirect_url,
                    session,
                }
            }
            _ => Route::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/home"),
            Route::Cart => f.write_str("/cart"),
            Route::Library => f.write_str("/library"),
            Route::Profile => f.write_str("/profile"),
            Route::Other(path) => f.write_str(path),
            Route::Login {
                redirect_url,
                session,
            } => {
                f.write_str("/login")?;
                let mut sep = '?';
                if let Some(url) = redirect_url {
                    write!(f, "{sep}redirectUrl={url}")?;
                    sep = '&';
                }
                if let Some(notice) = session {
                    write!(f, "{sep}session={}", notice.as_str())?;
                }
                Ok(())
            }
        }
    }
}

//=========================================================================================
// Flow outcomes
//=========================================================================================

/// Result of an action that needs an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The action was applied. `false` when it changed nothing (e.g. a book
    /// already in the library).
    Applied(bool),
    /// A deferred intent was recorded; the user should be sent here.
    LoginRequired(Route),
}

/// Result of a protected outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
    Ok(T),
    /// The token was rejected; the session has been cleared.
    SessionExpired(Route),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub user: User,
    pub landing: Route,
    pub replayed: Option<IntentAction>,
}

//=========================================================================================
// Context
//=========================================================================================

pub struct AppContext {
    session: Arc<SessionStore>,
    storage: Arc<UserStorage>,
    library: LibraryStore,
    cart: CartStore,
    tracker: TrackerStore,
    goals: GoalsStore,
    profile: ProfileStore,
    intents: DeferredIntentStore,
    quotes: Arc<QuoteRotator>,
    catalog: Arc<dyn CatalogService>,
}

impl AppContext {
    /// Restores any persisted session, then builds the stores on top of it.
    pub fn new(services: Services) -> Self {
        let session = Arc::new(SessionStore::new(services.backend.clone(), services.auth));
        session.restore_session();

        let storage = Arc::new(UserStorage::new(services.backend.clone(), session.clone()));
        let clock = services.clock;
        Self {
            library: LibraryStore::new(storage.clone(), &session, clock.clone()),
            cart: CartStore::new(storage.clone(), &session),
            tracker: TrackerStore::new(storage.clone(), &session, clock.clone()),
            goals: GoalsStore::new(storage.clone(), &session, clock.clone()),
            profile: ProfileStore::new(storage.clone(), &session),
            intents: DeferredIntentStore::with_ttl(
                services.intent_backend,
                clock,
                services.intent_ttl,
            ),
            quotes: QuoteRotator::new(services.quotes, services.backend),
            catalog: services.catalog,
            session,
            storage,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn storage(&self) -> &UserStorage {
        &self.storage
    }

    pub fn library(&self) -> &LibraryStore {
        &self.library
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn tracker(&self) -> &TrackerStore {
        &self.tracker
    }

    pub fn goals(&self) -> &GoalsStore {
        &self.goals
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn intents(&self) -> &DeferredIntentStore {
        &self.intents
    }

    pub fn quotes(&self) -> &Arc<QuoteRotator> {
        &self.quotes
    }

    pub fn add_to_cart(&self, book: CatalogBook) -> GateOutcome {
        self.gated(IntentAction::AddToCart { book })
    }

    pub fn add_to_library(&self, book: &CatalogBook) -> GateOutcome {
        self.gated(IntentAction::AddToLibrary {
            library_book: LibraryBook::from_catalog(book),
        })
    }

    fn gated(&self, action: IntentAction) -> GateOutcome {
        if self.session.is_authenticated() {
            return GateOutcome::Applied(self.apply(action));
        }
        let intent = self.intents.set(action.clone(), action.default_redirect());
        info!("Guest action deferred until login, redirecting to {}", intent.redirect_to);
        GateOutcome::LoginRequired(Route::login_for(intent.redirect_to))
    }

    fn apply(&self, action: IntentAction) -> bool {
        match action {
            IntentAction::AddToCart { book } => self.cart.add_to_cart(book, 1),
            IntentAction::AddToLibrary { library_book } => self.library.add(library_book),
        }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        redirect_url: Option<&str>,
    ) -> Result<SignedIn, AuthError> {
        let user = self.session.login(email, password).await?;
        Ok(self.land(user, redirect_url, Route::Home))
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        redirect_url: Option<&str>,
    ) -> Result<SignedIn, AuthError> {
        let user = self.session.register(email, password, name).await?;
        if let Some(name) = user.name.as_deref() {
            if self.profile.value().name.is_none() {
                self.profile.set_name(Some(name));
            }
        }
        Ok(self.land(user, redirect_url, Route::Profile))
    }

    /// Replays the pending intent, if any, and picks the landing route.
    fn land(&self, user: User, redirect_url: Option<&str>, fallback: Route) -> SignedIn {
        let replayed = self.intents.consume();
        let landing = match &replayed {
            Some(intent) => {
                debug!("Replaying deferred intent for {}", user.email);
                self.apply(intent.action.clone());
                Route::parse(&intent.redirect_to)
            }
            None => redirect_url
                .filter(|url| !url.trim().is_empty())
                .map(Route::parse)
                .unwrap_or(fallback),
        };
        SignedIn {
            user,
            landing,
            replayed: replayed.map(|intent| intent.action),
        }
    }

    pub fn logout(&self) -> Route {
        self.session.logout();
        Route::login_with_notice(SessionNotice::Logout)
    }

    /// Runs `call` with the current bearer token. An unauthorized response
    /// forces a logout instead of surfacing as an error.
    pub async fn protected<T, F, Fut>(&self, call: F) -> PortResult<Guarded<T>>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = PortResult<T>>,
    {
        match call(self.session.token()).await {
            Ok(value) => Ok(Guarded::Ok(value)),
            Err(PortError::Unauthorized) => {
                warn!("Session rejected by the server, logging out");
                self.session.logout();
                Ok(Guarded::SessionExpired(Route::login_with_notice(
                    SessionNotice::Expired,
                )))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn load_catalog(&self) -> PortResult<Guarded<Vec<CatalogBook>>> {
        let catalog = Arc::clone(&self.catalog);
        self.protected(|token| async move { catalog.fetch_books(token.as_deref()).await })
            .await
    }

    /// Guests are sent to the login view with a way back to `path`.
    pub fn require_auth(&self, path: &str) -> Result<(), Route> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(Route::login_for(path))
        }
    }

    /// Signed-in users have no business on the login or register views.
    pub fn guest_only(&self) -> Result<(), Route> {
        if self.session.is_authenticated() {
            Err(Route::Home)
        } else {
            Ok(())
        }
    }
}
