//! Handle-based subscription bus for the engine's event stream.
//!
//! Listeners are registered per [`EventKind`] as either repeating
//! (`listen`) or one-shot (`once`); both return a [`ListenerHandle`] whose
//! `cancel` removes the registration. Events are delivered in registration
//! order on whichever thread calls `emit`; the panel uses a single emitter
//! thread, so handlers never run concurrently with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::{EngineEvent, EventKind};

type Handler = Box<dyn FnMut(&EngineEvent) + Send>;

struct Listener {
    id: u64,
    once: bool,
    handler: Arc<Mutex<Handler>>,
}

#[derive(Default)]
struct Registry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

pub struct EventBus {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Registers a repeating listener for `kind`.
    pub fn listen(
        self: &Arc<Self>,
        kind: EventKind,
        handler: impl FnMut(&EngineEvent) + Send + 'static,
    ) -> ListenerHandle {
        self.register(kind, false, Box::new(handler))
    }

    /// Registers a listener that is removed after its first delivery.
    pub fn once(
        self: &Arc<Self>,
        kind: EventKind,
        handler: impl FnMut(&EngineEvent) + Send + 'static,
    ) -> ListenerHandle {
        self.register(kind, true, Box::new(handler))
    }

    fn register(self: &Arc<Self>, kind: EventKind, once: bool, handler: Handler) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.registry.lock().expect("bus registry poisoned");
        registry.listeners.entry(kind).or_default().push(Listener {
            id,
            once,
            handler: Arc::new(Mutex::new(handler)),
        });
        ListenerHandle {
            kind,
            id,
            bus: Arc::downgrade(self),
        }
    }

    /// Delivers `event` to every listener of its kind. One-shot listeners
    /// are unregistered before their handler runs, so a handler observing
    /// the bus never sees its own spent registration. Handlers are invoked
    /// outside the registry lock and may install or cancel listeners.
    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        let due: Vec<Arc<Mutex<Handler>>> = {
            let mut registry = self.registry.lock().expect("bus registry poisoned");
            let Some(listeners) = registry.listeners.get_mut(&kind) else {
                return;
            };
            let due = listeners
                .iter()
                .map(|listener| Arc::clone(&listener.handler))
                .collect();
            listeners.retain(|listener| !listener.once);
            due
        };

        for handler in due {
            let mut handler = handler.lock().expect("bus handler poisoned");
            handler(&event);
        }
    }

    /// Number of live registrations for `kind`. Used by teardown assertions.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        let registry = self.registry.lock().expect("bus registry poisoned");
        registry
            .listeners
            .get(&kind)
            .map_or(0, |listeners| listeners.len())
    }

    fn remove(&self, kind: EventKind, id: u64) {
        let mut registry = self.registry.lock().expect("bus registry poisoned");
        if let Some(listeners) = registry.listeners.get_mut(&kind) {
            listeners.retain(|listener| listener.id != id);
        }
    }
}

/// Cancellable registration. Cancelling is idempotent and a spent one-shot
/// handle cancels to a no-op; dropping the handle does not unregister.
#[derive(Clone)]
pub struct ListenerHandle {
    kind: EventKind,
    id: u64,
    bus: Weak<EventBus>,
}

impl ListenerHandle {
    pub fn cancel(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.kind, self.id);
        }
    }
}
