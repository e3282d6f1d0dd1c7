//! Store Subscriptions
//!
//! View components register a selector over the store snapshot plus a
//! callback. After every change the selector is re-evaluated and the callback
//! fires only when the selected value differs from the last one seen.

use std::fmt;

use indexmap::IndexMap;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Watcher<S> = Box<dyn FnMut(&S) -> bool>;

/// Registered selector/callback pairs over a snapshot type `S`.
pub struct Subscribers<S> {
    next_id: u64,
    watchers: IndexMap<SubscriptionId, Watcher<S>>,
}

impl<S> Default for Subscribers<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            watchers: IndexMap::new(),
        }
    }
}

impl<S> fmt::Debug for Subscribers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.watchers.len())
            .finish()
    }
}

impl<S: 'static> Subscribers<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher. `current` seeds the last-seen value, so the
    /// callback does not fire for the state at subscription time.
    pub fn subscribe<T, F, C>(&mut self, current: &S, selector: F, mut callback: C) -> SubscriptionId
    where
        T: PartialEq + 'static,
        F: Fn(&S) -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        let mut last = selector(current);
        let watcher = move |state: &S| {
            let value = selector(state);
            if value == last {
                return false;
            }
            callback(&value);
            last = value;
            true
        };

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.watchers.insert(id, Box::new(watcher));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.watchers.shift_remove(&id).is_some()
    }

    /// Re-evaluate every selector against `state`. Returns how many callbacks
    /// fired.
    pub fn notify(&mut self, state: &S) -> usize {
        let mut fired = 0;
        for watcher in self.watchers.values_mut() {
            if watcher(state) {
                fired += 1;
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}
