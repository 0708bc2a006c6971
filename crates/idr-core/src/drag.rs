//! Drag interaction state machine.
//!
//! Turns a press / move* / release sequence on one point into a local
//! optimistic position while the pointer moves and exactly one
//! [`CommittedMove`] on release:
//!
//! ```text
//! Idle --down--> Pressed --move--> Dragging --move--> Dragging
//!                   |                  |
//!                   +-------up---------+----> Idle (+ CommittedMove)
//! ```
//!
//! Nothing here touches the store or the network.

use kurbo::{Point, Vec2};

use crate::input::{MouseButton, PointerEvent};
use crate::point::PointId;

/// Phase of a drag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Pressed,
    Dragging,
}

/// The single result of a finished drag.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedMove {
    pub id: PointId,
    /// Final absolute display position.
    pub position: Point,
    /// Displacement from the position at press time.
    pub delta: Vec2,
}

impl CommittedMove {
    /// A click without movement.
    pub fn is_zero(&self) -> bool {
        self.delta.x == 0.0 && self.delta.y == 0.0
    }
}

/// Per-point drag state, alive from press to release.
#[derive(Debug, Clone)]
pub struct DragSession {
    /// The point being dragged.
    id: PointId,
    /// Display position when the press happened.
    origin: Point,
    /// Position the current delta is applied to.
    last_committed: Point,
    /// Pointer position at press.
    anchor: Point,
    /// Pointer displacement since press.
    delta: Vec2,
    is_moving: bool,
    phase: DragPhase,
}

impl DragSession {
    /// Start a session for `id` currently displayed at `display`, pressed
    /// with the pointer at `pointer`.
    pub fn press(id: impl Into<PointId>, display: Point, pointer: Point) -> Self {
        Self {
            id: id.into(),
            origin: display,
            last_committed: display,
            anchor: pointer,
            delta: Vec2::ZERO,
            is_moving: false,
            phase: DragPhase::Pressed,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Pointer displacement since press.
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    /// Optimistic position to render.
    pub fn current_position(&self) -> Point {
        self.last_committed + self.delta
    }

    /// Feed one pointer sample. Replaying the same sample gives the same
    /// position.
    pub fn update(&mut self, pointer: Point) -> Point {
        self.delta = pointer - self.anchor;
        self.is_moving = true;
        self.phase = DragPhase::Dragging;
        self.current_position()
    }

    /// Finish the session. The delta of the last move sample is folded in;
    /// the release position itself is not used so the point does not jump.
    pub fn release(mut self) -> CommittedMove {
        self.last_committed += self.delta;
        self.delta = Vec2::ZERO;
        self.is_moving = false;
        self.phase = DragPhase::Idle;

        CommittedMove {
            position: self.last_committed,
            delta: self.last_committed - self.origin,
            id: self.id,
        }
    }
}

/// What a pointer event did to the drag state.
#[derive(Debug, Clone, PartialEq)]
pub enum DragUpdate {
    /// Nothing to do (no session, wrong button, missed every point).
    Ignored,
    /// A session started on this point.
    Started(PointId),
    /// The point should be rendered at `position`.
    Moved { id: PointId, position: Point },
    /// The drag finished.
    Committed(CommittedMove),
}

/// Owns the active drag session, if any. One pointer drags one point.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a press is active.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The active session.
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Id of the point being dragged.
    pub fn active_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id())
    }

    /// Transient position override for `id` while it is being dragged.
    pub fn override_position(&self, id: &str) -> Option<Point> {
        self.session
            .as_ref()
            .filter(|s| s.id() == id && s.is_moving())
            .map(|s| s.current_position())
    }

    /// Press on point `id` displayed at `display`. Returns false if the
    /// button does not drag or a session is already running.
    pub fn on_pointer_down(
        &mut self,
        id: impl Into<PointId>,
        display: Point,
        pointer: Point,
        button: MouseButton,
    ) -> bool {
        if !button.is_primary() || self.session.is_some() {
            return false;
        }
        let session = DragSession::press(id, display, pointer);
        log::trace!("Drag pressed on '{}'", session.id());
        self.session = Some(session);
        true
    }

    /// Pointer moved. Returns the optimistic position while a session runs.
    pub fn on_pointer_move(&mut self, pointer: Point) -> Option<Point> {
        self.session.as_mut().map(|s| s.update(pointer))
    }

    /// Pointer released. Yields the committed move of the active session.
    pub fn on_pointer_up(&mut self, button: MouseButton) -> Option<CommittedMove> {
        if !button.is_primary() {
            return None;
        }
        let committed = self.session.take()?.release();
        log::debug!(
            "Drag committed on '{}' by ({}, {})",
            committed.id,
            committed.delta.x,
            committed.delta.y
        );
        Some(committed)
    }

    /// Drop the active session without committing.
    pub fn cancel(&mut self) -> bool {
        self.session.take().is_some()
    }

    /// Route a raw pointer event. `hit_test` maps a pointer position to the
    /// point under it and its display position; it is only consulted on
    /// press.
    pub fn handle_event(
        &mut self,
        event: PointerEvent,
        hit_test: impl FnOnce(Point) -> Option<(PointId, Point)>,
    ) -> DragUpdate {
        match event {
            PointerEvent::Down { position, button } => {
                if !button.is_primary() || self.is_active() {
                    return DragUpdate::Ignored;
                }
                match hit_test(position) {
                    Some((id, display)) => {
                        self.on_pointer_down(id.clone(), display, position, button);
                        DragUpdate::Started(id)
                    }
                    None => DragUpdate::Ignored,
                }
            }
            PointerEvent::Move { position } => match self.on_pointer_move(position) {
                Some(current) => DragUpdate::Moved {
                    id: self.active_id().unwrap_or_default().to_string(),
                    position: current,
                },
                None => DragUpdate::Ignored,
            },
            PointerEvent::Up { button, .. } => match self.on_pointer_up(button) {
                Some(committed) => DragUpdate::Committed(committed),
                None => DragUpdate::Ignored,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_pressed(id: &str, display: Point, pointer: Point) -> DragController {
        let mut drag = DragController::new();
        assert!(drag.on_pointer_down(id, display, pointer, MouseButton::Left));
        drag
    }

    #[test]
    fn test_press_records_origin() {
        let drag = controller_pressed("a", Point::new(10.0, 20.0), Point::new(11.0, 19.0));
        let session = drag.session().unwrap();
        assert_eq!(session.phase(), DragPhase::Pressed);
        assert!(!session.is_moving());
        assert_eq!(session.origin(), Point::new(10.0, 20.0));
        assert_eq!(session.current_position(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_move_is_relative_to_press() {
        let mut drag = controller_pressed("a", Point::new(10.0, 20.0), Point::new(100.0, 100.0));
        let pos = drag.on_pointer_move(Point::new(105.0, 90.0)).unwrap();
        assert_eq!(pos, Point::new(15.0, 10.0));
        assert_eq!(drag.session().unwrap().phase(), DragPhase::Dragging);
        assert_eq!(drag.override_position("a"), Some(Point::new(15.0, 10.0)));
        assert_eq!(drag.override_position("b"), None);
    }

    #[test]
    fn test_replaying_a_sample_is_idempotent() {
        let mut drag = controller_pressed("a", Point::ZERO, Point::ZERO);
        let first = drag.on_pointer_move(Point::new(3.0, 4.0));
        let second = drag.on_pointer_move(Point::new(3.0, 4.0));
        assert_eq!(first, second);
    }

    #[test]
    fn test_many_samples_one_commit() {
        let mut drag = controller_pressed("a", Point::new(1.0, 1.0), Point::new(50.0, 50.0));
        let samples = [(51.0, 50.0), (53.0, 48.0), (49.0, 45.0), (56.0, 47.0)];
        let mut per_sample_sum = Vec2::ZERO;
        let mut previous = Point::new(50.0, 50.0);
        for &(x, y) in &samples {
            let p = Point::new(x, y);
            per_sample_sum += p - previous;
            previous = p;
            drag.on_pointer_move(p);
        }

        let committed = drag.on_pointer_up(MouseButton::Left).unwrap();
        assert_eq!(committed.id, "a");
        assert_eq!(committed.delta, per_sample_sum);
        assert_eq!(committed.delta, Vec2::new(6.0, -3.0));
        assert_eq!(committed.position, Point::new(7.0, -2.0));

        assert!(!drag.is_active());
        assert!(drag.on_pointer_up(MouseButton::Left).is_none());
    }

    #[test]
    fn test_click_commits_zero_delta() {
        let mut drag = controller_pressed("a", Point::new(4.0, 4.0), Point::new(4.0, 4.0));
        let committed = drag.on_pointer_up(MouseButton::Left).unwrap();
        assert!(committed.is_zero());
        assert_eq!(committed.position, Point::new(4.0, 4.0));
    }

    #[test]
    fn test_secondary_buttons_do_not_drag() {
        let mut drag = DragController::new();
        assert!(!drag.on_pointer_down("a", Point::ZERO, Point::ZERO, MouseButton::Right));
        assert!(!drag.is_active());

        let mut drag = controller_pressed("a", Point::ZERO, Point::ZERO);
        assert!(!drag.on_pointer_down("b", Point::ZERO, Point::ZERO, MouseButton::Left));
        assert!(drag.on_pointer_up(MouseButton::Middle).is_none());
        assert_eq!(drag.active_id(), Some("a"));
    }

    #[test]
    fn test_cancel_discards_session() {
        let mut drag = controller_pressed("a", Point::ZERO, Point::ZERO);
        drag.on_pointer_move(Point::new(5.0, 5.0));
        assert!(drag.cancel());
        assert!(drag.on_pointer_up(MouseButton::Left).is_none());
    }

    #[test]
    fn test_handle_event_sequence() {
        let mut drag = DragController::new();
        let hit = |p: Point| (p.x < 10.0).then(|| ("a".to_string(), Point::new(2.0, 2.0)));

        assert_eq!(
            drag.handle_event(PointerEvent::down(Point::new(50.0, 0.0)), hit),
            DragUpdate::Ignored
        );
        assert_eq!(
            drag.handle_event(PointerEvent::down(Point::new(2.0, 2.0)), hit),
            DragUpdate::Started("a".to_string())
        );
        assert_eq!(
            drag.handle_event(PointerEvent::moved(Point::new(4.0, 1.0)), hit),
            DragUpdate::Moved {
                id: "a".to_string(),
                position: Point::new(4.0, 1.0),
            }
        );
        match drag.handle_event(PointerEvent::up(Point::new(99.0, 99.0)), hit) {
            DragUpdate::Committed(m) => {
                assert_eq!(m.position, Point::new(4.0, 1.0));
                assert_eq!(m.delta, Vec2::new(2.0, -1.0));
            }
            other => panic!("Expected commit, got {:?}", other),
        }
    }
}
