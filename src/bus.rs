//! Event listeners and the in-process bus which fans events out to them.

use std::{
    collections::HashMap,
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use futures_util::FutureExt;
use parking_lot::Mutex;

use crate::sse::Event;

/// Listener can be subscribed to an event type and process events of it.
#[async_trait::async_trait]
pub trait Listener: Send + Sync + 'static {
    /// callback will be executed for every published event of the subscribed type
    async fn on_event(self: Arc<Self>, event: Arc<Event>);
}

#[async_trait::async_trait]
impl<F, Fut> Listener for F
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    async fn on_event(self: Arc<Self>, event: Arc<Event>) {
        self(event).await
    }
}

type BlockingFn = dyn Fn(&Event) + Send + Sync;

#[derive(Clone)]
enum Callback {
    Async(Arc<dyn Listener>),
    Blocking(Arc<BlockingFn>),
}

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    listeners: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, event_type: &str, id: u64) -> bool {
        let mut listeners = self.listeners.lock();

        let Some(entries) = listeners.get_mut(event_type) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            listeners.remove(event_type);
        }

        removed
    }
}

/// Registry of listeners keyed by event type.
///
/// Cheap to clone, clones share listeners. Listeners may subscribe and unsubscribe from inside a
/// callback, publishing works on a snapshot so the current event is not affected.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Registry>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_counts())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an async listener.
    ///
    /// Inside a tokio runtime every call is spawned as its own task.
    pub fn subscribe<S, L>(&self, event_type: S, listener: L) -> Subscription
    where
        S: Into<String>,
        L: Listener,
    {
        self.add(event_type.into(), Callback::Async(Arc::new(listener)))
    }

    /// Subscribe a plain function.
    ///
    /// Inside a tokio runtime it runs on the blocking pool, otherwise inline in the publisher.
    pub fn subscribe_blocking<S, F>(&self, event_type: S, f: F) -> Subscription
    where
        S: Into<String>,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.add(event_type.into(), Callback::Blocking(Arc::new(f)))
    }

    fn add(&self, event_type: String, callback: Callback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .listeners
            .lock()
            .entry(event_type.clone())
            .or_default()
            .push(Entry { id, callback });

        log::trace!("Listener {} subscribed to {}", id, event_type);

        Subscription {
            registry: Arc::downgrade(&self.inner),
            event_type,
            id,
        }
    }

    /// Number of listeners per event type, types without listeners are absent
    pub fn listener_counts(&self) -> HashMap<String, usize> {
        self.inner
            .listeners
            .lock()
            .iter()
            .map(|(t, entries)| (t.clone(), entries.len()))
            .collect()
    }

    /// Dispatch an event to every listener of `event_type`, in subscribe order.
    ///
    /// A panicking listener is logged and does not affect the others. Returns the number of
    /// listeners the event was handed to.
    pub fn publish(&self, event_type: &str, event: Arc<Event>) -> usize {
        let callbacks: Vec<Callback> = match self.inner.listeners.lock().get(event_type) {
            Some(entries) => entries.iter().map(|e| e.callback.clone()).collect(),
            None => return 0,
        };

        log::trace!(
            "Publish {} to {} listener(s)",
            event_type,
            callbacks.len()
        );

        let count = callbacks.len();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                for callback in callbacks {
                    Self::spawn(&handle, event_type, callback, event.clone());
                }
            }
            Err(_) => {
                for callback in callbacks {
                    Self::run_inline(event_type, callback, event.clone());
                }
            }
        }

        count
    }

    fn spawn(
        handle: &tokio::runtime::Handle,
        event_type: &str,
        callback: Callback,
        event: Arc<Event>,
    ) {
        let event_type = event_type.to_string();

        match callback {
            Callback::Async(listener) => {
                handle.spawn(async move {
                    if AssertUnwindSafe(listener.on_event(event))
                        .catch_unwind()
                        .await
                        .is_err()
                    {
                        log::error!("Listener of {} panicked", event_type);
                    }
                });
            }
            Callback::Blocking(f) => {
                handle.spawn_blocking(move || {
                    if catch_unwind(AssertUnwindSafe(|| f(&event))).is_err() {
                        log::error!("Listener of {} panicked", event_type);
                    }
                });
            }
        }
    }

    fn run_inline(event_type: &str, callback: Callback, event: Arc<Event>) {
        let result = match callback {
            Callback::Blocking(f) => catch_unwind(AssertUnwindSafe(|| f(&event))),
            Callback::Async(listener) => {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Create runtime for listener of {} failed: {}", event_type, e);
                        return;
                    }
                };

                rt.block_on(AssertUnwindSafe(listener.on_event(event)).catch_unwind())
            }
        };

        if result.is_err() {
            log::error!("Listener of {} panicked", event_type);
        }
    }
}

/// Handle of a subscribed listener
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Registry>,
    event_type: String,
    id: u64,
}

impl Subscription {
    /// event type the listener is subscribed to
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove the listener. Removing an already removed listener only logs a warning.
    pub fn unsubscribe(&self) {
        let removed = match self.registry.upgrade() {
            Some(registry) => registry.remove(&self.event_type, self.id),
            None => false,
        };

        if removed {
            log::trace!("Listener {} unsubscribed from {}", self.id, self.event_type);
        } else {
            log::warn!(
                "Listener {} is not subscribed to {}, nothing to remove",
                self.id,
                self.event_type
            );
        }
    }
}
