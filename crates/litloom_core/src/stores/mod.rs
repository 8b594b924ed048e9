//! crates/litloom_core/src/stores/mod.rs
//!
//! The per-user domain stores. Each one owns a single collection or record,
//! persists it through the keyed storage adapter and republishes it whenever
//! the signed-in identity changes.

pub mod cart;
pub mod goals;
pub mod library;
pub mod profile;
pub mod tracker;

pub use cart::{CartStore, CartSummary};
pub use goals::{GoalProgress, GoalsStore};
pub use library::{LibraryCounts, LibraryStore};
pub use profile::ProfileStore;
pub use tracker::TrackerStore;

use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use crate::observable::{Observable, Subscription};
use crate::session::SessionStore;
use crate::storage::UserStorage;

/// When a store is allowed to touch storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Persistence {
    Always,
    /// Guests get an empty, memory-only value.
    AuthenticatedOnly,
}

type Loader<T> = Box<dyn Fn(&UserStorage, &str) -> T + Send + Sync>;

struct Slot<T> {
    storage: Arc<UserStorage>,
    key: &'static str,
    value: Observable<T>,
    load: Loader<T>,
    persistence: Persistence,
    /// Namespace the current value was loaded for.
    owner: Mutex<String>,
}

impl<T> Slot<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn read(&self) -> T {
        if self.persistence == Persistence::AuthenticatedOnly && !self.storage.is_authenticated() {
            return T::default();
        }
        (self.load)(&self.storage, self.key)
    }

    fn reload(&self) {
        let namespace = self.storage.namespace();
        debug!("Reloading '{}' for {}", self.key, namespace);
        let next = self.read();
        *self.owner.lock().unwrap_or_else(|e| e.into_inner()) = namespace;
        self.value.set(next);
    }

    fn owner(&self) -> String {
        self.owner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Weak read access to a slot for listeners that combine several of them.
pub(crate) struct Snapshot<T>(Weak<Slot<T>>);

impl<T> Snapshot<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// The current value tagged with the namespace it belongs to.
    pub(crate) fn read(&self) -> Option<(String, T)> {
        let slot = self.0.upgrade()?;
        let owner = slot.owner();
        Some((owner, slot.value.get()))
    }
}

/// One persisted, observable value bound to the current user's namespace.
///
/// Writes go to storage first and are published afterwards, so subscribers
/// never see a value that is not yet durable.
pub(crate) struct Persisted<T> {
    slot: Arc<Slot<T>>,
    _identity: Subscription,
}

impl<T> Persisted<T>
where
    T: Clone + Default + serde::Serialize + Send + Sync + 'static,
{
    pub(crate) fn new(
        storage: Arc<UserStorage>,
        session: &SessionStore,
        key: &'static str,
        load: impl Fn(&UserStorage, &str) -> T + Send + Sync + 'static,
        persistence: Persistence,
    ) -> Self {
        let slot = Arc::new(Slot {
            storage,
            key,
            value: Observable::new(T::default()),
            load: Box::new(load),
            persistence,
            owner: Mutex::new(String::new()),
        });
        // The identity subscription replays immediately, which performs the initial load.
        let weak: Weak<Slot<T>> = Arc::downgrade(&slot);
        let identity = session.subscribe(move |_| {
            if let Some(slot) = weak.upgrade() {
                slot.reload();
            }
        });
        Self {
            slot,
            _identity: identity,
        }
    }

    pub(crate) fn current(&self) -> T {
        self.slot.value.get()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.slot.value.with(f)
    }

    pub(crate) fn observable(&self) -> &Observable<T> {
        &self.slot.value
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        Snapshot(Arc::downgrade(&self.slot))
    }

    /// Persist (when allowed), then publish.
    pub(crate) fn commit(&self, next: T) {
        let slot = &self.slot;
        if slot.persistence == Persistence::Always || slot.storage.is_authenticated() {
            slot.storage.set(slot.key, &next);
        }
        slot.value.set(next);
    }

    /// Publish without touching storage.
    pub(crate) fn publish_only(&self, next: T) {
        self.slot.value.set(next);
    }

    /// Applies `f` to a copy of the current value and commits it if `f`
    /// reports a change. Returns whether anything was committed.
    pub(crate) fn mutate(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let mut next = self.current();
        if f(&mut next) {
            self.commit(next);
            true
        } else {
            false
        }
    }
}

/// Reads a JSON array entry by entry, dropping entries that do not decode.
pub(crate) fn load_lenient_list<T>(storage: &UserStorage, key: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    storage
        .get::<Vec<serde_json::Value>>(key, Vec::new())
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("Dropping unreadable entry in '{}': {}", key, e);
                None
            }
        })
        .collect()
}
