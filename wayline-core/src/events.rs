//! Event Channels
//!
//! Minimal typed publish/subscribe used by every plugin to expose observable
//! events and to collect votes.
//!
//! Dispatch iterates a snapshot of the subscriber list, so a subscriber may
//! subscribe or unsubscribe (itself or others) while being called. Changes made
//! during a dispatch take effect on the next one.
//!
//! # Example
//!
//! ```rust
//! use wayline_core::events::EventChannel;
//!
//! let channel: EventChannel<u32> = EventChannel::new();
//! let sub = channel.subscribe_fn(|n| println!("got {n}"));
//! channel.emit(&7);
//! sub.unsubscribe();
//! assert!(channel.is_empty());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Subscriber callback. `R` is `()` for notifications and `bool` for votes.
pub type Callback<T, R = ()> = Rc<dyn Fn(&T) -> R>;

type SubscriberList<T, R> = RefCell<Vec<Callback<T, R>>>;

fn same_callback<T, R>(a: &Callback<T, R>, b: &Callback<T, R>) -> bool {
    // Compare data pointers only; vtable pointers are not unique per type.
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Ordered list of subscriber callbacks.
///
/// Cloning a channel yields another handle to the same subscriber list.
pub struct EventChannel<T, R = ()> {
    subscribers: Rc<SubscriberList<T, R>>,
}

impl<T: 'static, R: 'static> EventChannel<T, R> {
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a callback. Registering the same callback twice is a no-op;
    /// the returned handle then refers to the existing registration.
    pub fn subscribe(&self, callback: Callback<T, R>) -> Subscription<T, R> {
        {
            let mut subscribers = self.subscribers.borrow_mut();
            if !subscribers.iter().any(|s| same_callback(s, &callback)) {
                subscribers.push(callback.clone());
            }
        }
        Subscription {
            callback,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    /// Convenience wrapper around [`subscribe`](Self::subscribe) for closures
    pub fn subscribe_fn(&self, callback: impl Fn(&T) -> R + 'static) -> Subscription<T, R> {
        self.subscribe(Rc::new(callback))
    }

    /// Remove a callback directly. Returns false if it was not registered.
    pub fn unsubscribe(&self, callback: &Callback<T, R>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| !same_callback(s, callback));
        subscribers.len() != before
    }

    /// Snapshot of the live subscriber list, in registration order
    pub fn subscribers(&self) -> Vec<Callback<T, R>> {
        self.subscribers.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Drop every subscriber
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

impl<T: 'static> EventChannel<T, ()> {
    /// Invoke every subscriber once, in registration order.
    ///
    /// Returns the number of subscribers called.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot = self.subscribers();
        for subscriber in &snapshot {
            subscriber(event);
        }
        snapshot.len()
    }
}

impl<T: 'static> EventChannel<T, bool> {
    /// Ask voters in registration order; true as soon as one approves.
    ///
    /// With no voters the answer is false.
    pub fn any(&self, candidate: &T) -> bool {
        self.subscribers().iter().any(|voter| voter(candidate))
    }
}

impl<T: 'static, R: 'static> Default for EventChannel<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> Clone for EventChannel<T, R> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<T, R> fmt::Debug for EventChannel<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

/// Handle returned by [`EventChannel::subscribe`].
///
/// Dropping the handle keeps the subscription; call
/// [`unsubscribe`](Self::unsubscribe) to remove it. The handle does not keep
/// the channel alive.
pub struct Subscription<T, R = ()> {
    callback: Callback<T, R>,
    subscribers: Weak<SubscriberList<T, R>>,
}

impl<T, R> Subscription<T, R> {
    /// Remove exactly this callback from its channel
    pub fn unsubscribe(self) -> bool {
        match self.subscribers.upgrade() {
            Some(subscribers) => {
                let mut subscribers = subscribers.borrow_mut();
                let before = subscribers.len();
                subscribers.retain(|s| !same_callback(s, &self.callback));
                subscribers.len() != before
            }
            None => false,
        }
    }

    /// Whether the callback is still registered
    pub fn is_active(&self) -> bool {
        self.subscribers
            .upgrade()
            .map(|subscribers| {
                subscribers
                    .borrow()
                    .iter()
                    .any(|s| same_callback(s, &self.callback))
            })
            .unwrap_or(false)
    }
}

impl<T, R> fmt::Debug for Subscription<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
