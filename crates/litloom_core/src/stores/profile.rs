//! crates/litloom_core/src/stores/profile.rs
//!
//! The single profile record of the signed-in user.

use std::sync::Arc;

use crate::domain::{Profile, ProfilePatch};
use crate::observable::Subscription;
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::stores::{Persisted, Persistence};

const PROFILE_KEY: &str = "profile";

pub struct ProfileStore {
    profile: Persisted<Profile>,
}

impl ProfileStore {
    pub fn new(storage: Arc<UserStorage>, session: &SessionStore) -> Self {
        Self {
            profile: Persisted::new(
                storage,
                session,
                PROFILE_KEY,
                |storage, key| clean(storage.get_or_default(key)),
                Persistence::Always,
            ),
        }
    }

    pub fn value(&self) -> Profile {
        self.profile.current()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Profile) + Send + Sync + 'static,
    {
        self.profile.observable().subscribe(listener)
    }

    /// Replaces the whole record.
    pub fn set(&self, profile: Profile) {
        self.profile.commit(clean(profile));
    }

    pub fn update(&self, patch: ProfilePatch) {
        let mut next = self.value();
        if let Some(name) = patch.name {
            next.name = Some(name);
        }
        if let Some(avatar_url) = patch.avatar_url {
            next.avatar_url = Some(avatar_url);
        }
        self.set(next);
    }

    pub fn set_name(&self, name: Option<&str>) {
        let mut next = self.value();
        next.name = name.map(str::to_string);
        self.set(next);
    }

    pub fn set_avatar_url(&self, avatar_url: Option<&str>) {
        let mut next = self.value();
        next.avatar_url = avatar_url.map(str::to_string);
        self.set(next);
    }

    pub fn clear(&self) {
        self.set(Profile::default());
    }
}

fn clean(profile: Profile) -> Profile {
    let trim = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Profile {
        name: trim(profile.name),
        avatar_url: trim(profile.avatar_url),
    }
}
