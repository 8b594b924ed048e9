pub mod app;
pub mod domain;
pub mod intent;
pub mod metrics;
pub mod observable;
pub mod ports;
pub mod quotes;
pub mod session;
pub mod storage;
pub mod stores;

#[cfg(test)]
mod testing;

pub use app::{AppContext, GateOutcome, Guarded, Route, Services, SessionNotice, SignedIn};
pub use domain::{
    AuthGrant, AuthSession, CartItem, CatalogBook, Credentials, DeferredIntent, Goal, GoalDraft,
    GoalKind, GoalPatch, IntentAction, LibraryBook, LibraryBookPatch, NewReadingSession, Profile,
    ProfilePatch, Quote, ReadingSession, ReadingSessionPatch, ReadingStatus, Registration,
    TrackerSettings, User,
};
pub use intent::DeferredIntentStore;
pub use observable::{Observable, Subscription};
pub use ports::{AuthGateway, CatalogService, Clock, KeyValueStore, PortError, PortResult, QuotesFeed};
pub use quotes::QuoteRotator;
pub use session::{AuthError, SessionStore};
pub use storage::{MemoryStore, StorageError, UserStorage};
pub use stores::{CartStore, GoalsStore, LibraryStore, ProfileStore, TrackerStore};
