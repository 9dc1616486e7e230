//! Single-threaded publish/subscribe for player notifications.
//!
//! Subscribing hands back an owned [`Subscription`]; dropping it unregisters
//! the handler, so a session that owns its subscriptions can never leave a
//! stale handler behind.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

type Handler<E> = Box<dyn FnMut(&E)>;

struct Registry<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
    dispatching: bool,
    released_during_dispatch: Vec<u64>,
    pending: VecDeque<E>,
}

impl<E> Registry<E> {
    /// Removes the handler and hands it back so it is dropped outside the borrow.
    fn release(&mut self, id: u64) -> Option<Handler<E>> {
        match self.handlers.iter().position(|(handler_id, _)| *handler_id == id) {
            Some(index) => Some(self.handlers.remove(index).1),
            None => {
                if self.dispatching {
                    self.released_during_dispatch.push(id);
                }
                None
            }
        }
    }
}

pub struct EventBus<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
                dispatching: false,
                released_during_dispatch: Vec::new(),
                pending: VecDeque::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&E) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, Box::new(handler)));
        trace!(id, "subscribed");

        let weak: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
        Subscription {
            id,
            release: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    let handler = registry.borrow_mut().release(id);
                    drop(handler);
                    trace!(id, "unsubscribed");
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }

    fn dispatch(&self, event: &E) {
        let mut active = std::mem::take(&mut self.registry.borrow_mut().handlers);

        for (id, handler) in active.iter_mut() {
            let released = self
                .registry
                .borrow()
                .released_during_dispatch
                .contains(id);
            if !released {
                handler(event);
            }
        }

        let released = std::mem::take(&mut self.registry.borrow_mut().released_during_dispatch);
        let (mut kept, dropped): (Vec<_>, Vec<_>) = active
            .into_iter()
            .partition(|(id, _)| !released.contains(id));
        {
            let mut registry = self.registry.borrow_mut();
            kept.append(&mut registry.handlers);
            registry.handlers = kept;
        }
        drop(dropped);
    }
}

impl<E: Clone + 'static> EventBus<E> {
    /// Delivers `event` to every handler registered when dispatch starts.
    ///
    /// Handlers may subscribe or drop subscriptions while running. An event
    /// emitted from inside a handler is queued and delivered, in order, once
    /// the current dispatch finishes, to the handlers registered at that point.
    pub fn emit(&self, event: &E) {
        {
            let mut registry = self.registry.borrow_mut();
            if registry.dispatching {
                trace!("nested emit queued");
                registry.pending.push_back(event.clone());
                return;
            }
            registry.dispatching = true;
        }

        self.dispatch(event);
        loop {
            let next = self.registry.borrow_mut().pending.pop_front();
            match next {
                Some(queued) => self.dispatch(&queued),
                None => break,
            }
        }
        self.registry.borrow_mut().dispatching = false;
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.registry.borrow().handlers.len())
            .finish()
    }
}

/// Registration handle returned by [`EventBus::subscribe`]. Unregisters on drop.
pub struct Subscription {
    id: u64,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
