//! Single-writer action dispatcher.
//!
//! A [`Dispatcher`] owns one state value and one reducer. Every action goes
//! through [`Dispatcher::dispatch`], which runs the reducer to completion and
//! notifies subscribers before returning. Dispatching from inside a dispatch
//! (for example from a subscriber) is refused, so state transitions happen in
//! strict submission order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

/// Pure state transition. Must return the same `Rc` when nothing changed.
pub type Reducer<S, A> = fn(&Rc<S>, &A) -> Rc<S>;

/// Handle returned by [`Dispatcher::subscribe`].
pub type SubscriptionId = u64;

type Listener<S> = Rc<RefCell<dyn FnMut(&Rc<S>)>>;

/// Dispatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Cannot dispatch in the middle of a dispatch")]
    Reentrant,
}

/// Clears the in-progress flag even if the reducer or a listener panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Holds the current state and applies actions to it one at a time.
pub struct Dispatcher<S, A> {
    state: RefCell<Rc<S>>,
    reducer: Reducer<S, A>,
    dispatching: Cell<bool>,
    listeners: RefCell<Vec<(SubscriptionId, Listener<S>)>>,
    next_subscription: Cell<SubscriptionId>,
}

impl<S, A> Dispatcher<S, A> {
    /// Create a dispatcher around an initial state and its reducer.
    pub fn new(initial: S, reducer: Reducer<S, A>) -> Self {
        Self {
            state: RefCell::new(Rc::new(initial)),
            reducer,
            dispatching: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            next_subscription: Cell::new(1),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> Rc<S> {
        Rc::clone(&self.state.borrow())
    }

    /// Whether a dispatch is running right now.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Register a change listener. Listeners run after every dispatch that
    /// produced a new state, in subscription order.
    pub fn subscribe(&self, listener: impl FnMut(&Rc<S>) + 'static) -> SubscriptionId {
        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        let listener: Listener<S> = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Run `action` through the reducer.
    ///
    /// Returns `Ok(true)` if the state changed and listeners were notified.
    pub fn dispatch(&self, action: A) -> Result<bool, DispatchError> {
        if self.dispatching.get() {
            log::error!("Re-entrant dispatch refused");
            return Err(DispatchError::Reentrant);
        }
        let _guard = DispatchGuard::enter(&self.dispatching);

        let current = self.state();
        let next = (self.reducer)(&current, &action);
        if Rc::ptr_eq(&current, &next) {
            return Ok(false);
        }

        *self.state.borrow_mut() = Rc::clone(&next);
        self.notify(&next);
        Ok(true)
    }

    fn notify(&self, state: &Rc<S>) {
        // Snapshot the list so listeners may (un)subscribe while we iterate.
        let snapshot: Vec<(SubscriptionId, Listener<S>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();

        for (id, listener) in snapshot {
            let still_subscribed = self.listeners.borrow().iter().any(|(sid, _)| *sid == id);
            if still_subscribed {
                (&mut *listener.borrow_mut())(state);
            }
        }
    }
}
