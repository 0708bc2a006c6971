//! The application store: canonical state plus its reducer.
//!
//! State only changes through [`Store::dispatch`]. Views and the sync gateway
//! hold a cheap clone of the same [`Store`] handle and read snapshots with
//! [`Store::get_state`].

use std::rc::Rc;

use crate::action::Action;
use crate::dataset::Dataset;
use crate::dispatcher::{DispatchError, Dispatcher, SubscriptionId};
use crate::todo::Todo;

/// Everything the store knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Points currently shown, in server order.
    pub dataset: Dataset,
    /// Legacy todo list.
    pub todos: Vec<Todo>,
}

/// The store reducer.
///
/// Pure and total: every no-op path hands back the input `Rc` untouched,
/// anything else yields a brand new top-level state.
pub fn reduce(state: &Rc<StoreState>, action: &Action) -> Rc<StoreState> {
    match action {
        Action::RefreshDataset { dataset } => Rc::new(StoreState {
            dataset: dataset.clone(),
            todos: state.todos.clone(),
        }),
        Action::MovePoint { id, delta } => {
            if delta.x == 0.0 && delta.y == 0.0 {
                return Rc::clone(state);
            }
            match state.dataset.moved(id, *delta) {
                Some(dataset) => Rc::new(StoreState {
                    dataset,
                    todos: state.todos.clone(),
                }),
                None => {
                    log::debug!("MOVE_POINT for unknown id '{}' dropped", id);
                    Rc::clone(state)
                }
            }
        }
        Action::AddTodo { text } => {
            if text.trim().is_empty() {
                return Rc::clone(state);
            }
            let mut todos = state.todos.clone();
            todos.push(Todo::new(text.clone()));
            Rc::new(StoreState {
                dataset: state.dataset.clone(),
                todos,
            })
        }
    }
}

/// Shared handle to the one store of a client session.
#[derive(Clone)]
pub struct Store {
    inner: Rc<Dispatcher<StoreState, Action>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    /// Create a store seeded with `state`.
    pub fn with_state(state: StoreState) -> Self {
        Self {
            inner: Rc::new(Dispatcher::new(state, reduce)),
        }
    }

    /// Current immutable snapshot.
    pub fn get_state(&self) -> Rc<StoreState> {
        self.inner.state()
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&self, action: Action) -> Result<bool, DispatchError> {
        let kind = action.kind();
        let changed = self.inner.dispatch(action)?;
        log::trace!("{} dispatched (changed: {})", kind, changed);
        Ok(changed)
    }

    /// Listen for state changes.
    pub fn subscribe(&self, listener: impl FnMut(&Rc<StoreState>) + 'static) -> SubscriptionId {
        self.inner.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    pub fn is_dispatching(&self) -> bool {
        self.inner.is_dispatching()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PointRecord;
    use kurbo::{Point, Vec2};
    use std::cell::{Cell, RefCell};

    fn dataset(points: &[(&str, f64, f64)]) -> Dataset {
        Dataset::from_records(points.iter().map(|&(id, x, y)| PointRecord::new(id, x, y)))
    }

    fn position(store: &Store, id: &str) -> Option<Point> {
        store.get_state().dataset.get(id).map(|p| p.position())
    }

    #[test]
    fn test_snapshot_replaces_not_merges() {
        let store = Store::new();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("a", 0.0, 0.0), ("b", 1.0, 1.0)])))
            .unwrap();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("c", 2.0, 2.0)])))
            .unwrap();

        assert_eq!(store.get_state().dataset.ids(), ["c"]);
    }

    #[test]
    fn test_moves_are_additive() {
        let store = Store::new();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("p", 0.0, 0.0)])))
            .unwrap();

        let action = Action::move_point("p", Vec2::new(3.0, 4.0));
        store.dispatch(action.clone()).unwrap();
        store.dispatch(action).unwrap();

        assert_eq!(position(&store, "p"), Some(Point::new(6.0, 8.0)));
        let point = store.get_state().dataset.get("p").cloned().unwrap();
        assert_eq!(point.domain_position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_unknown_id_returns_same_state() {
        let state = Rc::new(StoreState {
            dataset: dataset(&[("a", 1.0, 1.0)]),
            todos: Vec::new(),
        });
        let next = reduce(&state, &Action::move_point("ghost", Vec2::new(1.0, 1.0)));

        assert!(Rc::ptr_eq(&state, &next));
        assert_eq!(*state, *next);
    }

    #[test]
    fn test_refresh_supersedes_earlier_moves() {
        let store = Store::new();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("p1", 0.0, 0.0)])))
            .unwrap();
        store
            .dispatch(Action::move_point("p1", Vec2::new(1.0, 1.0)))
            .unwrap();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("p1", 5.0, 5.0)])))
            .unwrap();

        assert_eq!(position(&store, "p1"), Some(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_reducer_does_not_mutate_previous_snapshot() {
        let store = Store::new();
        store
            .dispatch(Action::refresh_dataset(dataset(&[("a", 0.0, 0.0), ("b", 1.0, 1.0)])))
            .unwrap();
        let before = store.get_state();

        store
            .dispatch(Action::move_point("a", Vec2::new(1.0, 2.0)))
            .unwrap();
        let after = store.get_state();

        assert_eq!(before.dataset.get("a").unwrap().position(), Point::new(0.0, 0.0));
        assert_eq!(after.dataset.get("a").unwrap().position(), Point::new(1.0, 2.0));
        assert_eq!(before.dataset.get("b"), after.dataset.get("b"));
    }

    #[test]
    fn test_add_todo() {
        let store = Store::new();
        assert!(!store.dispatch(Action::add_todo("")).unwrap());
        assert!(!store.dispatch(Action::add_todo("   ")).unwrap());
        assert!(store.dispatch(Action::add_todo("My first Task")).unwrap());
        assert!(store.dispatch(Action::add_todo("Fix me")).unwrap());

        let state = store.get_state();
        let texts: Vec<_> = state.todos.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["My first Task", "Fix me"]);
        assert!(state.todos.iter().all(|t| !t.complete));
    }

    #[test]
    fn test_notifies_only_on_change() {
        let store = Store::new();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        store.subscribe(move |_| seen.set(seen.get() + 1));

        store
            .dispatch(Action::refresh_dataset(dataset(&[("a", 0.0, 0.0)])))
            .unwrap();
        store
            .dispatch(Action::move_point("ghost", Vec2::new(1.0, 0.0)))
            .unwrap();
        store
            .dispatch(Action::move_point("a", Vec2::ZERO))
            .unwrap();
        store
            .dispatch(Action::move_point("a", Vec2::new(1.0, 0.0)))
            .unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_dispatch_from_subscriber_is_reentrant() {
        let store = Store::new();
        let outcome = Rc::new(RefCell::new(None));
        let handle = store.clone();
        let out = outcome.clone();
        store.subscribe(move |_| {
            *out.borrow_mut() = Some(handle.dispatch(Action::add_todo("nested")));
        });

        store.dispatch(Action::add_todo("outer")).unwrap();

        assert_eq!(*outcome.borrow(), Some(Err(DispatchError::Reentrant)));
        assert_eq!(store.get_state().todos.len(), 1);
    }
}
