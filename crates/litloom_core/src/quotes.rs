//! crates/litloom_core/src/quotes.rs
//!
//! The rotating quote banner: the feed is fetched once, the selected index and
//! the mute flag survive restarts, and auto-rotation runs as a background task
//! that is cancelled through a `CancellationToken`.

use rand::Rng;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::Quote;
use crate::observable::{Observable, Subscription};
use crate::ports::{KeyValueStore, QuotesFeed};

pub const QUOTE_INDEX_KEY: &str = "quote:index";
pub const QUOTE_MUTED_KEY: &str = "quote:muted";
pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RotationState {
    quotes: Vec<Quote>,
    index: usize,
}

impl RotationState {
    fn current(&self) -> Quote {
        if self.quotes.is_empty() {
            Quote::placeholder()
        } else {
            self.quotes[self.index % self.quotes.len()].clone()
        }
    }
}

pub struct QuoteRotator {
    feed: Arc<dyn QuotesFeed>,
    backend: Arc<dyn KeyValueStore>,
    state: Observable<RotationState>,
    rotation: Mutex<Option<CancellationToken>>,
}

impl QuoteRotator {
    pub fn new(feed: Arc<dyn QuotesFeed>, backend: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Arc::new(Self {
            feed,
            backend,
            state: Observable::new(RotationState::default()),
            rotation: Mutex::new(None),
        })
    }

    /// Loads the feed and the saved position. Unless muted, starts rotating.
    pub async fn init(self: &Arc<Self>, period: Duration) {
        let saved_index = self
            .read(QUOTE_INDEX_KEY)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let muted = self.read(QUOTE_MUTED_KEY).as_deref() == Some("1");

        let quotes = match self.feed.fetch_quotes().await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Could not load quotes: {}", e);
                Vec::new()
            }
        };
        info!("Loaded {} quotes", quotes.len());
        self.state.set(RotationState {
            quotes,
            index: saved_index,
        });
        self.write(QUOTE_INDEX_KEY, &saved_index.to_string());

        if !muted {
            self.start_auto_rotate(period);
        }
    }

    pub fn current(&self) -> Quote {
        self.state.with(RotationState::current)
    }

    pub fn index(&self) -> usize {
        self.state.with(|s| s.index)
    }

    pub fn len(&self) -> usize {
        self.state.with(|s| s.quotes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe_current<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Quote) + Send + Sync + 'static,
    {
        self.state.subscribe(move |s| listener(s.current()))
    }

    pub fn next(&self) {
        let (len, index) = self.state.with(|s| (s.quotes.len(), s.index));
        if len > 0 {
            self.set_index((index + 1) % len);
        }
    }

    pub fn prev(&self) {
        let (len, index) = self.state.with(|s| (s.quotes.len(), s.index));
        if len > 0 {
            self.set_index((index % len + len - 1) % len);
        }
    }

    pub fn random(&self) {
        let len = self.len();
        if len > 0 {
            self.set_index(rand::thread_rng().gen_range(0..len));
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.lock_rotation().is_some()
    }

    /// Spawns the rotation task on the current tokio runtime. Returns `false`
    /// if rotation is already running or no runtime is available.
    pub fn start_auto_rotate(self: &Arc<Self>, period: Duration) -> bool {
        let mut rotation = self.lock_rotation();
        if rotation.is_some() {
            return false;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start quote rotation without a runtime: {}", e);
                return false;
            }
        };
        let token = CancellationToken::new();
        let task_token = token.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        handle.spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => match weak.upgrade() {
                        Some(rotator) => rotator.next(),
                        None => break,
                    },
                }
            }
            debug!("Quote rotation stopped");
        });
        *rotation = Some(token);
        drop(rotation);
        self.write(QUOTE_MUTED_KEY, "0");
        true
    }

    pub fn stop_auto_rotate(&self) -> bool {
        let Some(token) = self.lock_rotation().take() else {
            return false;
        };
        token.cancel();
        self.write(QUOTE_MUTED_KEY, "1");
        true
    }

    fn set_index(&self, index: usize) {
        let mut next = self.state.get();
        next.index = index;
        self.write(QUOTE_INDEX_KEY, &index.to_string());
        self.state.set(next);
    }

    fn lock_rotation(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.rotation.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self, key: &str) -> Option<String> {
        self.backend.get(key).unwrap_or_else(|e| {
            warn!("Could not read '{}': {}", key, e);
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!("Could not write '{}': {}", key, e);
        }
    }
}

impl Drop for QuoteRotator {
    fn drop(&mut self) {
        if let Some(token) = self.lock_rotation().take() {
            token.cancel();
        }
    }
}
