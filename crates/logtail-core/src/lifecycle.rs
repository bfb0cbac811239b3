//! Process termination notifications
//!
//! The host owns a [`TerminationNotifier`] for the process whose output is
//! being tailed and calls [`TerminationNotifier::notify_terminated`] when it
//! exits. Consoles subscribe with [`subscribe_once`] so a termination is
//! acted on at most once no matter how often it is reported.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub type ListenerId = u64;

pub type Listener = Box<dyn FnMut() + Send>;

/// Source of process termination notifications
pub trait TerminationSource: Send + Sync {
    fn subscribe(&self, listener: Listener) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn unsubscribe(&self, id: ListenerId);
}

#[derive(Default)]
struct Registry {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, Listener)>,

    /// Set while listeners run outside the lock
    dispatching: bool,

    /// Ids removed during a dispatch
    removed: Vec<ListenerId>,
}

/// Listener registry for a host process
#[derive(Clone, Default)]
pub struct TerminationNotifier {
    inner: Arc<Mutex<Registry>>,
}

impl TerminationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every registered listener
    ///
    /// Listeners run without the registry locked, so they may subscribe or
    /// unsubscribe (including themselves) while being called.
    pub fn notify_terminated(&self) {
        let mut listeners = {
            let mut registry = self.inner.lock();
            registry.dispatching = true;
            std::mem::take(&mut registry.listeners)
        };
        debug!(count = listeners.len(), "Notifying process termination");

        for (_, listener) in listeners.iter_mut() {
            listener();
        }

        let mut registry = self.inner.lock();
        let removed = std::mem::take(&mut registry.removed);
        listeners.retain(|(id, _)| !removed.contains(id));
        // Keep listeners added during the dispatch, after the existing ones
        listeners.append(&mut registry.listeners);
        registry.listeners = listeners;
        registry.dispatching = false;
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

impl TerminationSource for TerminationNotifier {
    fn subscribe(&self, listener: Listener) -> ListenerId {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        let mut registry = self.inner.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(existing, _)| *existing != id);
        if registry.listeners.len() == before && registry.dispatching {
            registry.removed.push(id);
        }
    }
}

/// Run `action` on the first termination, then unsubscribe
pub fn subscribe_once<S, F>(source: &Arc<S>, action: F) -> ListenerId
where
    S: TerminationSource + ?Sized + 'static,
    F: FnOnce() + Send + 'static,
{
    let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
    let mut action = Some(action);

    let listener = {
        let slot = Arc::clone(&slot);
        // Weak: the source owns this listener
        let source = Arc::downgrade(source);
        move || {
            let Some(action) = action.take() else {
                return;
            };
            action();
            if let (Some(id), Some(source)) = (*slot.lock(), source.upgrade()) {
                source.unsubscribe(id);
            }
        }
    };

    let id = source.subscribe(Box::new(listener));
    *slot.lock() = Some(id);
    id
}
