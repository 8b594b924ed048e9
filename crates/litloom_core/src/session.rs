//! crates/litloom_core/src/session.rs
//!
//! Holds the current auth token and user, persists a single session record and
//! notifies subscribers whenever the identity changes.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{AuthSession, Credentials, Registration, User};
use crate::observable::{Observable, Subscription};
use crate::ports::{AuthGateway, KeyValueStore, PortError};

/// Storage key of the session record. Deliberately outside any user namespace.
pub const SESSION_KEY: &str = "litloom_auth";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Credentials rejected: {0}")]
    Rejected(String),
    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Text suitable for showing next to a login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Please enter an email and password.",
            AuthError::Rejected(_) => "Login failed. Check your email & password.",
            AuthError::Unavailable(_) => "The sign-in service is unavailable. Please try again.",
        }
    }
}

impl From<PortError> for AuthError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Rejected(msg) => AuthError::Rejected(msg),
            PortError::Unauthorized => AuthError::Rejected("unauthorized".to_string()),
            PortError::NotFound(msg) => AuthError::Rejected(msg),
            PortError::Unexpected(msg) => AuthError::Unavailable(msg),
        }
    }
}

//=========================================================================================
// Session Store
//=========================================================================================

/// `Anonymous <-> Authenticated`. Authentication is token presence only.
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn AuthGateway>,
    state: Observable<Option<AuthSession>>,
}

impl SessionStore {
    /// Creates an anonymous store. Call [`SessionStore::restore_session`] to
    /// rehydrate a persisted session.
    pub fn new(backend: Arc<dyn KeyValueStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            backend,
            gateway,
            state: Observable::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.with(|s| s.as_ref().map(|s| s.token.clone()))
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.with(|s| s.as_ref().map(|s| s.user.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.with(|s| s.is_some())
    }

    /// Fires with the current session now and on every login, logout or restore.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&AuthSession>) + Send + Sync + 'static,
    {
        self.state.subscribe(move |s| listener(s.as_ref()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let grant = self.gateway.login(&credentials).await.map_err(|e| {
            warn!("Login failed for {}: {}", email, e);
            AuthError::from(e)
        })?;

        let user = User::new(email);
        self.establish(AuthSession {
            token: grant.token,
            user: user.clone(),
        });
        info!("Signed in as {}", email);
        Ok(user)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        let registration = Registration {
            email: email.clone(),
            password: password.to_string(),
            name: name.clone(),
        };
        let grant = self.gateway.register(&registration).await.map_err(|e| {
            warn!("Registration failed for {}: {}", email, e);
            AuthError::from(e)
        })?;

        let user = User {
            email,
            id: grant.id,
            name,
            avatar: None,
        };
        self.establish(AuthSession {
            token: grant.token,
            user: user.clone(),
        });
        info!("Registered {}", user.email);
        Ok(user)
    }

    /// Clears the in-memory identity and the persisted record. Domain data is
    /// left in place under the user's namespace.
    pub fn logout(&self) {
        self.state.set(None);
        if let Err(e) = self.backend.remove(SESSION_KEY) {
            warn!("Failed to delete the session record: {}", e);
        }
    }

    /// Reads the persisted session. A record that cannot be parsed forces a logout.
    pub fn restore_session(&self) {
        let raw = match self.backend.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not read the session record: {}", e);
                self.logout();
                return;
            }
        };
        match serde_json::from_str::<AuthSession>(&raw) {
            Ok(session) if !session.token.is_empty() => {
                info!("Restored session for {}", session.user.email);
                self.state.set(Some(session));
            }
            Ok(_) => {
                warn!("Persisted session has no token, logging out");
                self.logout();
            }
            Err(e) => {
                warn!("Persisted session is malformed, logging out: {}", e);
                self.logout();
            }
        }
    }

    /// Persists, then publishes.
    pub(crate) fn establish(&self, session: AuthSession) {
        match serde_json::to_string(&session) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(SESSION_KEY, &raw) {
                    warn!("Failed to persist the session record: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialise the session record: {}", e),
        }
        self.state.set(Some(session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedAuth;

    fn store_with(auth: ScriptedAuth) -> (Arc<MemoryStore>, SessionStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone(), Arc::new(auth));
        (backend, store)
    }

    #[tokio::test]
    async fn login_persists_token_and_user() {
        let (backend, store) = store_with(ScriptedAuth::accepting("tok-1"));

        let user = store.login("  reader@example.com ", "secret").await.unwrap();
        assert_eq!(user.email, "reader@example.com");
        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-1"));

        let raw = backend.get(SESSION_KEY).unwrap().unwrap();
        let persisted: AuthSession = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.user.email, "reader@example.com");
    }

    #[tokio::test]
    async fn rejected_login_leaves_store_anonymous() {
        let (backend, store) = store_with(ScriptedAuth::rejecting("user not found"));

        let err = store.login("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(err.user_message(), "Login failed. Check your email & password.");
        assert!(!store.is_authenticated());
        assert!(backend.get(SESSION_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn register_normalises_email_and_keeps_id() {
        let (_, store) = store_with(ScriptedAuth::accepting("tok").with_id(4));
        let user = store
            .register(" New@Example.com ", "pw", Some("  Ada "))
            .await
            .unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.id, Some(4));
        assert_eq!(user.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn missing_password_never_reaches_the_gateway() {
        let auth = ScriptedAuth::accepting("tok");
        let calls = auth.calls();
        let (_, store) = store_with(auth);
        assert_eq!(
            store.login("a@b.c", "").await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn restore_rehydrates_a_valid_record() {
        let (backend, store) = store_with(ScriptedAuth::accepting("unused"));
        backend
            .set(SESSION_KEY, r#"{"token":"abc","user":{"email":"x@y.z"}}"#)
            .unwrap();

        store.restore_session();
        assert_eq!(store.current_user().unwrap().email, "x@y.z");
        assert_eq!(store.token().as_deref(), Some("abc"));
    }

    #[test]
    fn restore_with_corrupt_record_forces_logout() {
        let (backend, store) = store_with(ScriptedAuth::accepting("unused"));
        backend.set(SESSION_KEY, "{oops").unwrap();

        store.restore_session();
        assert!(!store.is_authenticated());
        assert!(backend.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn logout_notifies_subscribers() {
        let (_, store) = store_with(ScriptedAuth::accepting("unused"));
        store.establish(AuthSession {
            token: "t".into(),
            user: User::new("a@b.c"),
        });

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |s| {
            sink.lock().unwrap().push(s.map(|s| s.user.email.clone()))
        });
        store.logout();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("a@b.c".to_string()), None]
        );
    }
}
