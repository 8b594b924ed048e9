//! crates/litloom_core/src/stores/cart.rs
//!
//! The shopping cart. Lines are merged by book id and a line is removed rather
//! than stored with a quantity below one. Only signed-in users have a persisted
//! cart; a guest always sees an empty one.

use std::sync::Arc;

use crate::domain::{CartItem, CatalogBook};
use crate::observable::Subscription;
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::stores::{load_lenient_list, Persisted, Persistence};

const CART_KEY: &str = "cart";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CartSummary {
    /// Sum of quantities.
    pub count: u32,
    pub total: f64,
}

impl CartSummary {
    pub fn of(items: &[CartItem]) -> Self {
        Self {
            count: items.iter().map(|i| i.quantity).sum(),
            total: items.iter().map(CartItem::line_total).sum(),
        }
    }
}

pub struct CartStore {
    items: Persisted<Vec<CartItem>>,
}

impl CartStore {
    pub fn new(storage: Arc<UserStorage>, session: &SessionStore) -> Self {
        Self {
            items: Persisted::new(
                storage,
                session,
                CART_KEY,
                |storage, key| {
                    load_lenient_list::<CartItem>(storage, key)
                        .into_iter()
                        .filter(|i| i.quantity > 0)
                        .collect()
                },
                Persistence::AuthenticatedOnly,
            ),
        }
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.items.current()
    }

    pub fn count(&self) -> u32 {
        self.summary().count
    }

    pub fn total(&self) -> f64 {
        self.summary().total
    }

    pub fn summary(&self) -> CartSummary {
        self.items.with(|items| CartSummary::of(items))
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Vec<CartItem>) + Send + Sync + 'static,
    {
        self.items.observable().subscribe(listener)
    }

    pub fn subscribe_summary<F>(&self, listener: F) -> Subscription
    where
        F: Fn(CartSummary) + Send + Sync + 'static,
    {
        self.items
            .observable()
            .subscribe(move |items| listener(CartSummary::of(items)))
    }

    /// Merges into an existing line for the same book, else appends one.
    pub fn add_to_cart(&self, book: CatalogBook, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        self.items.mutate(|items| {
            match items.iter_mut().find(|i| i.book.id == book.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                None => items.push(CartItem { book, quantity }),
            }
            true
        })
    }

    /// Sets an absolute quantity; zero or less removes the line.
    pub fn set_quantity(&self, book_id: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(book_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.items.mutate(|items| match items.iter_mut().find(|i| i.book.id == book_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        })
    }

    pub fn increment(&self, book_id: &str) -> bool {
        self.items.mutate(|items| match items.iter_mut().find(|i| i.book.id == book_id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(1);
                true
            }
            None => false,
        })
    }

    /// Drops the line once its quantity would reach zero.
    pub fn decrement(&self, book_id: &str) -> bool {
        self.items.mutate(|items| {
            let Some(pos) = items.iter().position(|i| i.book.id == book_id) else {
                return false;
            };
            if items[pos].quantity > 1 {
                items[pos].quantity -= 1;
            } else {
                items.remove(pos);
            }
            true
        })
    }

    pub fn remove(&self, book_id: &str) -> bool {
        self.items.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.book.id != book_id);
            items.len() != before
        })
    }

    pub fn clear(&self) {
        self.items.commit(Vec::new());
    }

    /// Empties the visible cart without writing storage.
    pub fn clear_in_memory(&self) {
        self.items.publish_only(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::KeyValueStore;
    use crate::testing::Harness;
    use serde_json::json;

    fn book(id: &str, price: f64) -> CatalogBook {
        CatalogBook::new(id, format!("Book {id}")).with_price(price)
    }

    fn signed_in() -> (Harness, CartStore) {
        let h = Harness::new();
        h.sign_in("buyer@example.com");
        let cart = CartStore::new(h.storage.clone(), &h.session);
        (h, cart)
    }

    #[test]
    fn summary_stream_replays_then_follows_changes() {
        let (_h, cart) = signed_in();
        cart.add_to_cart(book("1", 10.0), 1);

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let _sub = cart.subscribe_summary(move |s| sink.lock().unwrap().push((s.count, s.total)));
        cart.increment("1");
        cart.remove("1");

        assert_eq!(*seen.lock().unwrap(), vec![(1, 10.0), (2, 20.0), (0, 0.0)]);
    }

    #[test]
    fn adding_the_same_book_merges_quantities() {
        let (_h, cart) = signed_in();
        cart.add_to_cart(book("1", 10.0), 1);
        cart.add_to_cart(book("1", 10.0), 2);
        cart.add_to_cart(book("2", 5.0), 1);

        let items = cart.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(cart.count(), 4);
        assert_eq!(cart.total(), 35.0);
    }

    #[test]
    fn decrement_removes_the_line_at_one() {
        let (_h, cart) = signed_in();
        cart.add_to_cart(book("1", 10.0), 2);
        cart.decrement("1");
        assert_eq!(cart.items()[0].quantity, 1);
        cart.decrement("1");
        assert!(cart.items().is_empty());
    }

    #[test]
    fn set_quantity_to_zero_removes() {
        let (_h, cart) = signed_in();
        cart.add_to_cart(book("1", 10.0), 2);
        cart.set_quantity("1", 0);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn invalid_prices_count_as_zero() {
        let (h, _) = signed_in();
        h.storage.set(
            "cart",
            &json!([
                { "book": { "id": 1, "title": "Priced", "price": 10 }, "qty": 2 },
                { "book": { "id": 2, "title": "Broken", "price": "bad" }, "qty": 1 }
            ]),
        );
        let cart = CartStore::new(h.storage.clone(), &h.session);
        assert_eq!(cart.total(), 20.0);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn guest_cart_is_empty_and_never_persisted() {
        let h = Harness::new();
        let cart = CartStore::new(h.storage.clone(), &h.session);
        cart.add_to_cart(book("1", 3.0), 1);
        assert_eq!(cart.count(), 1);
        assert!(h.backend.get("litloom:guest:cart").unwrap().is_none());

        h.sign_in("buyer@example.com");
        assert!(cart.items().is_empty());
        h.sign_out();
        assert!(cart.items().is_empty());
    }

    #[test]
    fn persist_happens_before_publish() {
        let (h, cart) = signed_in();
        let backend = h.backend.clone();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = cart.subscribe(move |items| {
            let stored = backend
                .get("litloom:buyer@example.com:cart")
                .unwrap()
                .map(|raw| serde_json::from_str::<Vec<CartItem>>(&raw).unwrap().len());
            sink.lock().unwrap().push((items.len(), stored));
        });

        cart.add_to_cart(book("1", 1.0), 1);
        assert_eq!(seen.lock().unwrap().last(), Some(&(1, Some(1))));
    }

    #[test]
    fn clear_in_memory_keeps_storage() {
        let (h, cart) = signed_in();
        cart.add_to_cart(book("1", 1.0), 1);
        cart.clear_in_memory();
        assert!(cart.items().is_empty());
        assert!(h
            .backend
            .get("litloom:buyer@example.com:cart")
            .unwrap()
            .is_some());
    }
}
