//! crates/litloom_core/src/intent.rs
//!
//! Remembers one action a guest tried before being sent to log in, so it can be
//! replayed exactly once afterwards. Stale or unreadable records are dropped.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{DeferredIntent, IntentAction};
use crate::ports::{Clock, KeyValueStore};

pub const INTENT_KEY: &str = "litloom_intent";
pub const DEFAULT_INTENT_TTL_MINUTES: i64 = 20;

pub struct DeferredIntentStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl DeferredIntentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(backend, clock, Duration::minutes(DEFAULT_INTENT_TTL_MINUTES))
    }

    pub fn with_ttl(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            backend,
            clock,
            ttl,
        }
    }

    /// Records the intent with the default time-to-live.
    pub fn set(&self, action: IntentAction, redirect_to: impl Into<String>) -> DeferredIntent {
        self.set_for(action, redirect_to, self.ttl)
    }

    /// Records the intent, replacing any previous one. Expiry is absolute.
    pub fn set_for(
        &self,
        action: IntentAction,
        redirect_to: impl Into<String>,
        ttl: Duration,
    ) -> DeferredIntent {
        let intent = DeferredIntent {
            action,
            redirect_to: redirect_to.into(),
            expires_at: self.clock.now() + ttl,
        };
        match serde_json::to_string(&intent) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(INTENT_KEY, &raw) {
                    warn!("Failed to store deferred intent: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialise deferred intent: {}", e),
        }
        intent
    }

    /// Reads without consuming. Expired or malformed records are cleared.
    pub fn peek(&self) -> Option<DeferredIntent> {
        let raw = match self.backend.get(INTENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read deferred intent: {}", e);
                return None;
            }
        };
        let intent = match serde_json::from_str::<DeferredIntent>(&raw) {
            Ok(intent) => intent,
            Err(e) => {
                debug!("Dropping malformed deferred intent: {}", e);
                self.clear();
                return None;
            }
        };
        if intent.is_expired(self.clock.now()) {
            debug!("Dropping expired deferred intent");
            self.clear();
            return None;
        }
        Some(intent)
    }

    /// At-most-once: a second call after a successful one yields `None`.
    pub fn consume(&self) -> Option<DeferredIntent> {
        let intent = self.peek()?;
        self.clear();
        Some(intent)
    }

    pub fn clear(&self) {
        if let Err(e) = self.backend.remove(INTENT_KEY) {
            warn!("Failed to clear deferred intent: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CatalogBook;
    use crate::storage::MemoryStore;
    use crate::testing::FixedClock;

    fn store() -> (Arc<MemoryStore>, Arc<FixedClock>, DeferredIntentStore) {
        let backend = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::on(2026, 10, 19));
        let intents = DeferredIntentStore::new(backend.clone(), clock.clone());
        (backend, clock, intents)
    }

    fn add_to_cart() -> IntentAction {
        IntentAction::AddToCart {
            book: CatalogBook::new("1", "Dune"),
        }
    }

    #[test]
    fn consume_delivers_at_most_once() {
        let (_, _, intents) = store();
        intents.set(add_to_cart(), "/cart");

        let first = intents.consume().unwrap();
        assert_eq!(first.redirect_to, "/cart");
        assert!(intents.consume().is_none());
    }

    #[test]
    fn peek_does_not_consume() {
        let (_, _, intents) = store();
        intents.set(add_to_cart(), "/cart");
        assert!(intents.peek().is_some());
        assert!(intents.peek().is_some());
    }

    #[test]
    fn expired_intent_is_absent_and_cleared() {
        let (backend, clock, intents) = store();
        intents.set(add_to_cart(), "/cart");
        clock.advance(Duration::minutes(21));

        assert!(intents.peek().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn intent_within_ttl_survives() {
        let (_, clock, intents) = store();
        intents.set_for(add_to_cart(), "/cart", Duration::minutes(5));
        clock.advance(Duration::minutes(4));
        assert!(intents.peek().is_some());
    }

    #[test]
    fn malformed_record_is_dropped() {
        let (backend, _, intents) = store();
        backend.set(INTENT_KEY, "{\"action\":").unwrap();
        assert!(intents.consume().is_none());
        assert!(backend.is_empty());
    }
}
