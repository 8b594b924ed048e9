//! crates/litloom_core/src/observable.rs
//!
//! A replay-latest value cell. Subscribers get the current value as soon as they
//! register and every value published afterwards, delivered synchronously on the
//! publishing thread.

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::task::{Context, Poll};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Inner<T> {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener<T>)>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared, observable value. Clones refer to the same cell.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Borrows the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.value.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Replaces the value and notifies every subscriber.
    ///
    /// No lock is held while listeners run, so a listener may read or publish.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write().unwrap_or_else(|e| e.into_inner());
            *guard = value.clone();
        }
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Registers `listener` and immediately calls it with the current value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener<T> = Arc::new(listener);
        self.inner.listeners().push((id, Arc::clone(&listener)));

        let current = self.get();
        listener(&current);

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners().retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// The values as an async stream, starting with the current one.
    pub fn watch(&self) -> Watch<T> {
        let (tx, rx) = mpsc::unbounded();
        let subscription = self.subscribe(move |value: &T| {
            let _ = tx.unbounded_send(value.clone());
        });
        Watch {
            rx,
            _subscription: subscription,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

//=========================================================================================
// Subscription Handle
//=========================================================================================

/// Keeps a listener registered. Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that is not attached to anything.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

//=========================================================================================
// Stream Adapter
//=========================================================================================

/// Stream of published values; unsubscribes when dropped.
pub struct Watch<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> Stream for Watch<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn subscribe_replays_current_value_then_updates() {
        let cell = Observable::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = cell.subscribe(move |v| sink.lock().unwrap().push(*v));

        cell.set(2);
        cell.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn dropping_the_subscription_stops_delivery() {
        let cell = Observable::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = cell.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(cell.subscriber_count(), 1);

        sub.unsubscribe();
        cell.set(5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_publish_without_deadlocking() {
        let source = Observable::new(1);
        let mirror = Observable::new(0);
        let target = mirror.clone();
        let _sub = source.subscribe(move |v| target.set(v * 10));

        source.set(4);
        assert_eq!(mirror.get(), 40);
    }

    #[tokio::test]
    async fn watch_yields_current_and_later_values() {
        let cell = Observable::new("a".to_string());
        let mut stream = cell.watch();
        cell.set("b".to_string());

        assert_eq!(stream.next().await.as_deref(), Some("a"));
        assert_eq!(stream.next().await.as_deref(), Some("b"));
    }
}
