//! Ordered observer lists.
//!
//! An [`Event`] is a list of handlers keyed by the [`ComponentId`] of their
//! subscriber. Dispatch is synchronous on the calling thread, in subscription
//! order, over a snapshot of the list taken when dispatch starts. Handlers may
//! therefore subscribe or unsubscribe (themselves or others) while running; the
//! change takes effect from the next dispatch.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::ComponentId;

type Handler<A, E> = Arc<dyn Fn(&A) -> Result<(), E> + Send + Sync>;

/// Observer list carrying an argument of type `A`.
///
/// Handlers return `Result<(), E>`; the first error stops dispatch and is
/// returned from [`Event::emit`].
pub struct Event<A: ?Sized, E> {
    name: &'static str,
    handlers: RwLock<Vec<(ComponentId, Handler<A, E>)>>,
}

impl<A: ?Sized, E> Event<A, E> {
    /// Create an empty observer list. `name` is used for logging only.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe `subscriber` with `handler`.
    ///
    /// Returns `false` and keeps the existing handler if `subscriber` is
    /// already subscribed.
    pub fn subscribe<F>(&self, subscriber: ComponentId, handler: F) -> bool
    where
        F: Fn(&A) -> Result<(), E> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write();
        if handlers.iter().any(|(id, _)| *id == subscriber) {
            return false;
        }
        handlers.push((subscriber, Arc::new(handler)));
        log::trace!("Event '{}': subscribed {}", self.name, subscriber);
        true
    }

    /// Remove the handler of `subscriber`. Returns `false` if there was none.
    pub fn unsubscribe(&self, subscriber: ComponentId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscriber);
        let removed = handlers.len() != before;
        if removed {
            log::trace!("Event '{}': unsubscribed {}", self.name, subscriber);
        }
        removed
    }

    pub fn is_subscribed(&self, subscriber: ComponentId) -> bool {
        self.handlers.read().iter().any(|(id, _)| *id == subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Dispatch `args` to every handler in subscription order.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; later handlers are not called.
    pub fn emit(&self, args: &A) -> Result<(), E> {
        let snapshot: Vec<Handler<A, E>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        log::trace!("Event '{}': dispatching to {} handler(s)", self.name, snapshot.len());
        for handler in snapshot {
            handler(args)?;
        }
        Ok(())
    }
}

impl<A: ?Sized, E> fmt::Debug for Event<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ComponentId> = self.handlers.read().iter().map(|(id, _)| *id).collect();
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("subscribers", &ids)
            .finish()
    }
}

static_assertions::assert_impl_all!(Event<(), ()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_in_subscription_order() {
        let event: Event<u32, ()> = Event::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            event.subscribe(ComponentId::next(), move |value| {
                seen.lock().push((tag, *value));
                Ok(())
            });
        }

        event.emit(&7).unwrap();
        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7), ("c", 7)]);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let event: Event<(), ()> = Event::new("test");
        let id = ComponentId::next();
        let calls = Arc::new(Mutex::new(0));

        let c = Arc::clone(&calls);
        assert!(event.subscribe(id, move |_| {
            *c.lock() += 1;
            Ok(())
        }));
        assert!(!event.subscribe(id, |_| Ok(())));
        assert_eq!(event.subscriber_count(), 1);

        event.emit(&()).unwrap();
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let event: Event<(), ()> = Event::new("test");
        let id = ComponentId::next();
        event.subscribe(id, |_| Ok(()));

        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        assert!(!event.is_subscribed(id));
    }

    #[test]
    fn test_first_error_stops_dispatch() {
        let event: Event<(), &'static str> = Event::new("test");
        let reached = Arc::new(Mutex::new(false));

        event.subscribe(ComponentId::next(), |_| Err("boom"));
        let r = Arc::clone(&reached);
        event.subscribe(ComponentId::next(), move |_| {
            *r.lock() = true;
            Ok(())
        });

        assert_eq!(event.emit(&()), Err("boom"));
        assert!(!*reached.lock());
    }

    #[test]
    fn test_handler_may_unsubscribe_during_dispatch() {
        let event: Arc<Event<(), ()>> = Arc::new(Event::new("test"));
        let id = ComponentId::next();
        let calls = Arc::new(Mutex::new(0));

        let weak = Arc::downgrade(&event);
        let c = Arc::clone(&calls);
        event.subscribe(id, move |_| {
            *c.lock() += 1;
            if let Some(event) = weak.upgrade() {
                event.unsubscribe(id);
            }
            Ok(())
        });

        event.emit(&()).unwrap();
        event.emit(&()).unwrap();
        assert_eq!(*calls.lock(), 1);
    }
}
