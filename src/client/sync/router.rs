//! # Update Event Router
//!
//! In-process publish/subscribe bus for [`SyncEvent`]s. Producers and the edit
//! gate never hold references to each other; they meet here.
//!
//! ## Delivery Guarantees
//!
//! - `publish` is synchronous: every subscriber registered when the event is
//!   dispatched sees it before `publish` returns, in registration order.
//! - The subscriber list is snapshotted per event, so a handler may subscribe
//!   or unsubscribe (itself included) without disturbing the current dispatch.
//! - A handler that publishes re-entrantly does not interleave: its event is
//!   queued and dispatched after the current one has reached every subscriber.
//! - Publishes from different threads take turns. A second thread blocks until
//!   the running dispatch has drained, then delivers its own event before
//!   returning.
//! - If a handler panics, events it queued re-entrantly are dropped with a
//!   warning and the router stays usable.

use crate::shared::event::SyncEvent;
use crate::shared::lock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

/// Subscriber callback
pub type EventHandler = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Handle returned by [`UpdateEventRouter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct RouterInner {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, EventHandler)>,
    queue: VecDeque<SyncEvent>,
    dispatcher: Option<ThreadId>,
}

#[derive(Default)]
struct RouterShared {
    inner: Mutex<RouterInner>,
    /// Held by the publishing thread for a whole dispatch
    turn: Mutex<()>,
}

/// Typed fan-out bus for sync events
#[derive(Clone, Default)]
pub struct UpdateEventRouter {
    shared: Arc<RouterShared>,
}

impl fmt::Debug for UpdateEventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.shared.inner);
        f.debug_struct("UpdateEventRouter")
            .field("subscribers", &inner.subscribers.len())
            .field("queued", &inner.queue.len())
            .finish()
    }
}

/// Releases the dispatch slot if a handler panics mid-dispatch
struct DispatchGuard<'a> {
    inner: &'a Mutex<RouterInner>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let dropped = {
            let mut inner = lock(self.inner);
            inner.dispatcher = None;
            inner.queue.drain(..).map(|event| event.kind).collect::<Vec<_>>()
        };
        if !dropped.is_empty() {
            tracing::warn!(
                "[ROUTER] handler panicked, dropped {} queued events: {:?}",
                dropped.len(),
                dropped
            );
        }
    }
}

impl UpdateEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide router shared by every view that does not bring its own
    pub fn global() -> &'static UpdateEventRouter {
        static GLOBAL: OnceLock<UpdateEventRouter> = OnceLock::new();
        GLOBAL.get_or_init(UpdateEventRouter::new)
    }

    /// Register a handler; it receives every event published from now on
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.shared.inner);
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push((id, Arc::new(handler)));
        tracing::trace!("[ROUTER] subscriber {:?} registered", id);
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = lock(&self.shared.inner);
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = inner.subscribers.len() != before;
        if removed {
            tracing::trace!("[ROUTER] subscriber {:?} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.inner).subscribers.len()
    }

    /// Deliver an event to every subscriber
    pub fn publish(&self, event: SyncEvent) {
        let me = thread::current().id();
        {
            let mut inner = lock(&self.shared.inner);
            if inner.dispatcher == Some(me) {
                inner.queue.push_back(event);
                tracing::trace!("[ROUTER] {:?} queued behind current dispatch", event.kind);
                return;
            }
        }

        let _turn = lock(&self.shared.turn);
        {
            let mut inner = lock(&self.shared.inner);
            inner.dispatcher = Some(me);
            inner.queue.push_back(event);
        }

        let _guard = DispatchGuard {
            inner: &self.shared.inner,
        };
        loop {
            let (event, subscribers) = {
                let mut inner = lock(&self.shared.inner);
                match inner.queue.pop_front() {
                    Some(event) => (event, inner.subscribers.clone()),
                    None => {
                        inner.dispatcher = None;
                        return;
                    }
                }
            };

            tracing::trace!(
                "[ROUTER] dispatching {:?} from {:?} to {} subscribers",
                event.kind,
                event.source,
                subscribers.len()
            );
            for (_, handler) in subscribers {
                handler(&event);
            }
        }
    }
}
