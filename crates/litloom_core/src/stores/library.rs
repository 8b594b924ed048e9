//! crates/litloom_core/src/stores/library.rs
//!
//! The user's personal library: a set of books keyed by id, each carrying a
//! reading status and a favorite flag.

use std::sync::Arc;

use crate::domain::{LibraryBook, LibraryBookPatch, ReadingStatus};
use crate::observable::Subscription;
use crate::ports::Clock;
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::stores::{Persisted, Persistence};

const LIBRARY_KEY: &str = "library";

/// Badge counts derived from the library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryCounts {
    pub total: usize,
    pub reading: usize,
    pub finished: usize,
    pub favorites: usize,
}

impl LibraryCounts {
    pub fn of(books: &[LibraryBook]) -> Self {
        Self {
            total: books.len(),
            reading: books.iter().filter(|b| b.status == ReadingStatus::Reading).count(),
            finished: books.iter().filter(|b| b.status == ReadingStatus::Finished).count(),
            favorites: books.iter().filter(|b| b.favorite).count(),
        }
    }
}

pub struct LibraryStore {
    books: Persisted<Vec<LibraryBook>>,
    clock: Arc<dyn Clock>,
}

impl LibraryStore {
    pub fn new(storage: Arc<UserStorage>, session: &SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            books: Persisted::new(
                storage,
                session,
                LIBRARY_KEY,
                |storage, key| dedupe(storage.get_or_default(key)),
                Persistence::Always,
            ),
            clock,
        }
    }

    pub fn list(&self) -> Vec<LibraryBook> {
        self.books.current()
    }

    pub fn get(&self, id: &str) -> Option<LibraryBook> {
        self.books.with(|books| books.iter().find(|b| b.id == id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.books.with(|books| books.iter().any(|b| b.id == id))
    }

    pub fn counts(&self) -> LibraryCounts {
        self.books.with(|books| LibraryCounts::of(books))
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Vec<LibraryBook>) + Send + Sync + 'static,
    {
        self.books.observable().subscribe(listener)
    }

    pub fn subscribe_counts<F>(&self, listener: F) -> Subscription
    where
        F: Fn(LibraryCounts) + Send + Sync + 'static,
    {
        self.books
            .observable()
            .subscribe(move |books| listener(LibraryCounts::of(books)))
    }

    /// Adds the book unless one with the same id is already present.
    /// New entries go to the front and get an `added_at` stamp.
    pub fn add(&self, mut book: LibraryBook) -> bool {
        let now = self.clock.now();
        self.books.mutate(|books| {
            if books.iter().any(|b| b.id == book.id) {
                return false;
            }
            book.added_at.get_or_insert(now);
            books.insert(0, book);
            true
        })
    }

    pub fn remove(&self, id: &str) -> bool {
        self.books.mutate(|books| {
            let before = books.len();
            books.retain(|b| b.id != id);
            books.len() != before
        })
    }

    pub fn toggle_favorite(&self, id: &str) -> bool {
        self.edit(id, |book| book.favorite = !book.favorite)
    }

    pub fn set_status(&self, id: &str, status: ReadingStatus) -> bool {
        self.edit(id, |book| book.status = status)
    }

    pub fn update(&self, id: &str, patch: LibraryBookPatch) -> bool {
        self.edit(id, move |book| patch.apply(book))
    }

    pub fn clear(&self) {
        self.books.commit(Vec::new());
    }

    /// Silently does nothing when `id` is absent.
    fn edit(&self, id: &str, f: impl FnOnce(&mut LibraryBook)) -> bool {
        self.books.mutate(|books| match books.iter_mut().find(|b| b.id == id) {
            Some(book) => {
                f(book);
                true
            }
            None => false,
        })
    }
}

/// Keeps the first entry for each id.
fn dedupe(mut books: Vec<LibraryBook>) -> Vec<LibraryBook> {
    let mut seen = std::collections::HashSet::new();
    books.retain(|b| seen.insert(b.id.clone()));
    books
}
