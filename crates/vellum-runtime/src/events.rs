#![forbid(unsafe_code)]

//! Named-channel event emitter.
//!
//! Components use two emitters: one keyed by data key for watchers, and
//! one carrying every tracked change on the [`DATA_CHANGE`] channel.
//!
//! # Invariants
//!
//! 1. Handlers on a channel run in registration order.
//! 2. `emit` dispatches over a snapshot: handlers added during an emit are
//!    not called by it; handlers removed during an emit still are.
//! 3. No borrow of the emitter is held while a handler runs, so handlers
//!    may register, remove or emit freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use vellum_core::Value;

/// Channel carrying every tracked change of a component.
pub const DATA_CHANGE: &str = "dataChange";

/// Payload of a tracked change.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    /// Key that was written. For nested containers this is the nested key.
    pub key: String,
    pub new_value: Value,
    pub old_value: Value,
}

/// Identifies one registration on an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<P> = Rc<dyn Fn(&P)>;

struct EmitterInner<P> {
    next_id: u64,
    channels: IndexMap<String, Vec<(ListenerId, Handler<P>)>>,
}

/// Shared emitter. Clones refer to the same set of channels.
pub struct EventEmitter<P> {
    inner: Rc<RefCell<EmitterInner<P>>>,
}

impl<P> Clone for EventEmitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P> Default for EventEmitter<P> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                next_id: 0,
                channels: IndexMap::new(),
            })),
        }
    }
}

impl<P: 'static> EventEmitter<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `event`.
    pub fn on(&self, event: &str, handler: impl Fn(&P) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .channels
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Register `handler` and return a handle that removes it.
    pub fn subscribe(&self, event: &str, handler: impl Fn(&P) + 'static) -> Unwatch {
        let id = self.on(event, handler);
        let weak: Weak<RefCell<EmitterInner<P>>> = Rc::downgrade(&self.inner);
        let event = event.to_string();
        Unwatch::new(move || {
            if let Some(inner) = weak.upgrade() {
                EventEmitter { inner }.off(&event, id);
            }
        })
    }

    /// Remove one registration. Returns `false` if it was not present.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(handlers) = inner.channels.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            inner.channels.shift_remove(event);
        }
        removed
    }

    /// Call every handler registered on `event`. Returns how many ran.
    pub fn emit(&self, event: &str, payload: &P) -> usize {
        let snapshot: Vec<Handler<P>> = self
            .inner
            .borrow()
            .channels
            .get(event)
            .map(|handlers| handlers.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .channels
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Remove every handler on every channel.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut self.inner.borrow_mut().channels);
        // Drop handlers outside the borrow.
        drop(dropped);
    }
}

impl<P> fmt::Debug for EventEmitter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut map = f.debug_map();
        for (event, handlers) in &inner.channels {
            map.entry(event, &handlers.len());
        }
        map.finish()
    }
}

/// Removes one registration. Calling [`unwatch`](Self::unwatch) more than
/// once is a no-op. Dropping the handle does **not** unregister.
pub struct Unwatch {
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Unwatch {
    pub(crate) fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    pub fn unwatch(&self) {
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether [`unwatch`](Self::unwatch) has not been called yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remove.borrow().is_some()
    }
}

impl fmt::Debug for Unwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unwatch")
            .field("active", &self.is_active())
            .finish()
    }
}
