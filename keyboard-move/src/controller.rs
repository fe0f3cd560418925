use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use chess::Dests;
use chess_common::{format_square, role_from_san};
use cozy_chess::{Piece, Square};
use tracing::{debug, trace};

use crate::session::{BoardSession, Promotion};
use crate::step::Step;

/// Callback the parser registers to receive positions.
pub type KeyboardMoveHandler = Rc<dyn Fn(&str, Option<&Dests>)>;

/// Keyboard move controller.
///
/// A cheap clonable handle; clones share state. Invalid input (unknown piece
/// codes, empty pockets, occupied squares, pawn "promotions") is ignored, it
/// never surfaces as an error.
pub struct KeyboardMove<S: BoardSession> {
    inner: Rc<Inner<S>>,
}

struct Inner<S> {
    session: Rc<RefCell<S>>,
    promotion: Rc<RefCell<dyn Promotion>>,
    redraw: Box<dyn Fn()>,
    focus: Cell<bool>,
    used_san: Cell<bool>,
    handler: RefCell<Option<KeyboardMoveHandler>>,
    /// Latest position seen while no handler was registered.
    pending: RefCell<Option<Step>>,
}

impl<S: BoardSession> KeyboardMove<S> {
    /// `step` is the session's current position; it waits in the buffer until
    /// a handler is registered.
    pub fn new(
        session: Rc<RefCell<S>>,
        promotion: Rc<RefCell<dyn Promotion>>,
        step: Step,
        redraw: impl Fn() + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                session,
                promotion,
                redraw: Box::new(redraw),
                focus: Cell::new(false),
                used_san: Cell::new(false),
                handler: RefCell::new(None),
                pending: RefCell::new(Some(step)),
            }),
        }
    }

    /// Forward a new position to the parser, or buffer it until one attaches.
    /// Only the latest buffered position is kept.
    pub fn update(&self, step: Step) {
        // Clone the handler out so it may call back into the controller.
        let handler = self.inner.handler.borrow().clone();
        match handler {
            Some(handler) => {
                trace!(ply = step.ply, "delivering position to parser");
                handler(&step.fen, step.dests.as_ref());
            }
            None => {
                trace!(ply = step.ply, "no parser yet, buffering position");
                *self.inner.pending.borrow_mut() = Some(step);
            }
        }
    }

    /// Register the parser callback, replacing any previous one, and flush the
    /// buffered position to it.
    pub fn register_handler(&self, handler: impl Fn(&str, Option<&Dests>) + 'static) {
        let handler: KeyboardMoveHandler = Rc::new(handler);
        if self
            .inner
            .handler
            .replace(Some(Rc::clone(&handler)))
            .is_some()
        {
            debug!("replacing registered keyboard move handler");
        }

        let pending = self.inner.pending.borrow_mut().take();
        if let Some(step) = pending {
            trace!(ply = step.ply, "flushing buffered position to parser");
            handler(&step.fen, step.dests.as_ref());
        }
    }

    pub fn has_handler(&self) -> bool {
        self.inner.handler.borrow().is_some()
    }

    /// Select `square`, or cancel the selection if it is already selected.
    pub fn select(&self, square: Square) {
        let mut session = self.inner.session.borrow_mut();
        if session.selected() == Some(square) {
            session.cancel_move();
        } else {
            session.select_square(square, true);
        }
    }

    pub fn has_selected(&self) -> Option<Square> {
        self.inner.session.borrow().selected()
    }

    /// Drop a piece from the player's pocket onto `square`.
    pub fn drop(&self, square: Square, piece: &str) {
        let Some(role) = role_from_san(piece) else {
            debug!(piece, "drop ignored: unknown piece code");
            return;
        };

        let mut session = self.inner.session.borrow_mut();
        let color = session.player_color();
        let in_pocket = session
            .pockets()
            .is_some_and(|pockets| pockets.count(color, role) > 0);
        if !in_pocket {
            debug!(?role, "drop ignored: piece not in pocket");
            return;
        }
        if session.piece_on(square).is_some() {
            debug!(square = %format_square(square), "drop ignored: square occupied");
            return;
        }
        if !session.drop_valid(role, square) {
            debug!(
                ?role,
                square = %format_square(square),
                "drop ignored: rejected by variant rules"
            );
            return;
        }

        session.cancel_move();
        session.new_piece(role, color, square);
        session.send_new_piece(role, square, false);
    }

    /// Resolve a pending promotion with the piece named by `piece`.
    pub fn promote(&self, orig: Square, dest: Square, piece: &str) {
        let Some(role) = role_from_san(piece).filter(|&role| role != Piece::Pawn) else {
            debug!(piece, "promotion ignored: not a promotion piece");
            return;
        };

        self.inner.session.borrow_mut().cancel_move();
        self.inner
            .promotion
            .borrow_mut()
            .send_promotion(orig, dest, role, false);
    }

    /// Play a move the parser resolved from SAN or UCI, as two selections.
    pub fn san(&self, orig: Square, dest: Square) {
        self.inner.used_san.set(true);
        self.inner.session.borrow_mut().cancel_move();
        self.select(orig);
        self.select(dest);
    }

    /// Whether a SAN move has been played through the keyboard this session.
    pub fn used_san(&self) -> bool {
        self.inner.used_san.get()
    }

    pub fn confirm_move(&self) {
        self.inner.session.borrow_mut().submit_move(true);
    }

    /// Move `delta` plies through the game, backwards when negative. Stops at
    /// the start position.
    pub fn jump(&self, delta: i32) {
        {
            let mut session = self.inner.session.borrow_mut();
            let target = session.ply().saturating_add_signed(delta);
            session.user_jump(target);
        }
        (self.inner.redraw)();
    }

    pub fn has_focus(&self) -> bool {
        self.inner.focus.get()
    }

    pub fn set_focus(&self, focus: bool) {
        self.inner.focus.set(focus);
        (self.inner.redraw)();
    }

    pub fn clock(&self) -> Option<S::Clock> {
        self.inner.session.borrow().clock()
    }
}

impl<S: BoardSession> Clone for KeyboardMove<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: BoardSession> fmt::Debug for KeyboardMove<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardMove")
            .field("focus", &self.inner.focus.get())
            .field("used_san", &self.inner.used_san.get())
            .field("has_handler", &self.has_handler())
            .field("pending", &self.inner.pending.borrow().as_ref().map(|s| s.ply))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBoardSession, MockCall};
    use chess::Pockets;
    use chess_common::parse_square;
    use cozy_chess::Color;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    fn step(ply: u32) -> Step {
        Step::new(ply, format!("fen-{ply}"), None)
    }

    struct Harness {
        session: Rc<RefCell<MockBoardSession>>,
        ctrl: KeyboardMove<MockBoardSession>,
        redraws: Rc<Cell<u32>>,
    }

    impl Harness {
        fn new(session: MockBoardSession) -> Self {
            let session = Rc::new(RefCell::new(session));
            let redraws = Rc::new(Cell::new(0));
            let counter = Rc::clone(&redraws);
            let ctrl = KeyboardMove::new(
                Rc::clone(&session),
                session.clone(),
                step(0),
                move || counter.set(counter.get() + 1),
            );
            Self {
                session,
                ctrl,
                redraws,
            }
        }

        fn calls(&self) -> Vec<MockCall> {
            self.session.borrow().get_calls()
        }

        fn clear_calls(&self) {
            self.session.borrow_mut().clear_calls();
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str, Option<&Dests>)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |fen: &str, _: Option<&Dests>| {
            sink.borrow_mut().push(fen.to_string())
        })
    }

    #[test]
    fn initial_step_is_flushed_on_register() {
        let h = Harness::new(MockBoardSession::new());
        let (seen, handler) = recorder();
        h.ctrl.register_handler(handler);
        assert_eq!(*seen.borrow(), vec!["fen-0"]);
    }

    #[test]
    fn buffer_keeps_only_latest_update() {
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.update(step(1));
        h.ctrl.update(step(2));
        let (seen, handler) = recorder();
        h.ctrl.register_handler(handler);
        assert_eq!(*seen.borrow(), vec!["fen-2"]);
    }

    #[test]
    fn updates_after_register_are_delivered_in_order() {
        let h = Harness::new(MockBoardSession::new());
        let (seen, handler) = recorder();
        h.ctrl.register_handler(handler);
        h.ctrl.update(step(1));
        h.ctrl.update(step(2));
        h.ctrl.update(step(3));
        assert_eq!(*seen.borrow(), vec!["fen-0", "fen-1", "fen-2", "fen-3"]);
    }

    #[test]
    fn buffer_is_cleared_after_flush() {
        let h = Harness::new(MockBoardSession::new());
        let (first, handler) = recorder();
        h.ctrl.register_handler(handler);
        let (second, handler) = recorder();
        h.ctrl.register_handler(handler);
        assert_eq!(*first.borrow(), vec!["fen-0"]);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn reregistration_replaces_handler() {
        let h = Harness::new(MockBoardSession::new());
        let (first, handler) = recorder();
        h.ctrl.register_handler(handler);
        let (second, handler) = recorder();
        h.ctrl.register_handler(handler);
        h.ctrl.update(step(5));
        assert_eq!(*first.borrow(), vec!["fen-0"]);
        assert_eq!(*second.borrow(), vec!["fen-5"]);
    }

    #[test]
    fn dests_are_forwarded() {
        let h = Harness::new(MockBoardSession::new());
        let got = Rc::new(Cell::new(None));
        let sink = Rc::clone(&got);
        h.ctrl.register_handler(move |_, dests: Option<&Dests>| {
            sink.set(dests.map(|d| d.len()));
        });
        assert_eq!(got.get(), None);

        let dests = chess::Game::new().dests();
        h.ctrl.update(Step::new(0, "start", Some(dests)));
        assert_eq!(got.get(), Some(10));
    }

    #[test]
    fn handler_may_call_back_into_controller() {
        let h = Harness::new(MockBoardSession::new());
        let ctrl = h.ctrl.clone();
        h.ctrl.register_handler(move |_, _| {
            ctrl.select(sq("e2"));
            assert_eq!(ctrl.has_selected(), Some(sq("e2")));
        });
        h.ctrl.update(step(1));
        assert_eq!(h.ctrl.has_selected(), Some(sq("e2")));
    }

    #[test]
    fn select_new_square_forces_selection() {
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.select(sq("e2"));
        assert_eq!(h.ctrl.has_selected(), Some(sq("e2")));
        assert_eq!(
            h.calls(),
            vec![MockCall::SelectSquare {
                square: sq("e2"),
                force: true
            }]
        );
    }

    #[test]
    fn select_same_square_cancels() {
        let h = Harness::new(MockBoardSession::new().with_selected(sq("e2")));
        h.ctrl.select(sq("e2"));
        assert_eq!(h.ctrl.has_selected(), None);
        assert_eq!(h.calls(), vec![MockCall::CancelMove]);
    }

    fn crazyhouse_session() -> MockBoardSession {
        MockBoardSession::new().with_pockets(Pockets::new().with(Color::White, Piece::Queen, 1))
    }

    #[test]
    fn drop_places_and_submits_once() {
        let h = Harness::new(crazyhouse_session());
        h.ctrl.drop(sq("e4"), "Q");
        assert_eq!(
            h.calls(),
            vec![
                MockCall::CancelMove,
                MockCall::NewPiece {
                    piece: Piece::Queen,
                    color: Color::White,
                    square: sq("e4")
                },
                MockCall::SendNewPiece {
                    piece: Piece::Queen,
                    square: sq("e4"),
                    premove: false
                },
            ]
        );
    }

    #[test]
    fn repeated_drop_with_empty_pocket_is_ignored() {
        let h = Harness::new(crazyhouse_session());
        h.ctrl.drop(sq("e4"), "Q");
        h.clear_calls();
        h.ctrl.drop(sq("d4"), "Q");
        assert!(h.calls().is_empty());
    }

    #[test]
    fn drop_rejections_are_silent() {
        // unknown code
        let h = Harness::new(crazyhouse_session());
        h.ctrl.drop(sq("e4"), "X");
        h.ctrl.drop(sq("e4"), "q");
        assert!(h.calls().is_empty());

        // not a drop game
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.drop(sq("e4"), "Q");
        assert!(h.calls().is_empty());

        // empty pocket for this kind
        let h = Harness::new(crazyhouse_session());
        h.ctrl.drop(sq("e4"), "N");
        assert!(h.calls().is_empty());

        // pocket belongs to the other color
        let h = Harness::new(crazyhouse_session().with_player_color(Color::Black));
        h.ctrl.drop(sq("e4"), "Q");
        assert!(h.calls().is_empty());

        // occupied
        let h = Harness::new(crazyhouse_session().with_piece(sq("e4"), Piece::Pawn, Color::Black));
        h.ctrl.drop(sq("e4"), "Q");
        assert!(h.calls().is_empty());

        // rules say no
        let h = Harness::new(crazyhouse_session().with_drops_allowed(false));
        h.ctrl.drop(sq("e4"), "Q");
        assert!(h.calls().is_empty());
    }

    #[test]
    fn promote_sends_choice_once() {
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.promote(sq("e7"), sq("e8"), "N");
        assert_eq!(
            h.calls(),
            vec![
                MockCall::CancelMove,
                MockCall::SendPromotion {
                    orig: sq("e7"),
                    dest: sq("e8"),
                    piece: Piece::Knight,
                    premove: false
                },
            ]
        );
    }

    #[test]
    fn promote_to_pawn_or_unknown_is_ignored() {
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.promote(sq("e7"), sq("e8"), "P");
        h.ctrl.promote(sq("e7"), sq("e8"), "Z");
        h.ctrl.promote(sq("e7"), sq("e8"), "");
        assert!(h.calls().is_empty());
    }

    #[test]
    fn san_selects_origin_then_destination() {
        let h = Harness::new(MockBoardSession::new());
        assert!(!h.ctrl.used_san());
        h.ctrl.san(sq("g1"), sq("f3"));
        assert!(h.ctrl.used_san());
        assert_eq!(
            h.calls(),
            vec![
                MockCall::CancelMove,
                MockCall::SelectSquare {
                    square: sq("g1"),
                    force: true
                },
                MockCall::SelectSquare {
                    square: sq("f3"),
                    force: true
                },
            ]
        );
        h.ctrl.san(sq("b1"), sq("c3"));
        assert!(h.ctrl.used_san());
    }

    #[test]
    fn confirm_submits_final_move() {
        let h = Harness::new(MockBoardSession::new());
        h.ctrl.confirm_move();
        assert_eq!(h.calls(), vec![MockCall::SubmitMove { confirm: true }]);
    }

    #[test]
    fn jump_is_relative_and_redraws_once() {
        let h = Harness::new(MockBoardSession::new().with_ply(10));
        h.ctrl.jump(-3);
        assert_eq!(h.calls(), vec![MockCall::UserJump { ply: 7 }]);
        assert_eq!(h.redraws.get(), 1);

        h.ctrl.jump(0);
        assert_eq!(h.redraws.get(), 2);
        assert_eq!(h.session.borrow().ply(), 7);
    }

    #[test]
    fn jump_stops_at_start_position() {
        let h = Harness::new(MockBoardSession::new().with_ply(2));
        h.ctrl.jump(-5);
        assert_eq!(h.calls(), vec![MockCall::UserJump { ply: 0 }]);
    }

    #[test]
    fn set_focus_redraws() {
        let h = Harness::new(MockBoardSession::new());
        assert!(!h.ctrl.has_focus());
        h.ctrl.set_focus(true);
        assert!(h.ctrl.has_focus());
        assert_eq!(h.redraws.get(), 1);
        h.ctrl.set_focus(false);
        assert!(!h.ctrl.has_focus());
        assert_eq!(h.redraws.get(), 2);
    }

    #[test]
    fn clock_passes_through() {
        let h = Harness::new(MockBoardSession::new());
        assert_eq!(h.ctrl.clock(), None);
        let h = Harness::new(MockBoardSession::new().with_clock(300));
        assert_eq!(h.ctrl.clock(), Some(300));
    }

    proptest! {
        #[test]
        fn only_last_buffered_update_is_delivered(plies in proptest::collection::vec(1u32..500, 0..20)) {
            let h = Harness::new(MockBoardSession::new());
            for &ply in &plies {
                h.ctrl.update(step(ply));
            }
            let (seen, handler) = recorder();
            h.ctrl.register_handler(handler);
            let expected = format!("fen-{}", plies.last().copied().unwrap_or(0));
            prop_assert_eq!(seen.borrow().clone(), vec![expected]);
        }

        #[test]
        fn registered_handler_sees_every_update(plies in proptest::collection::vec(0u32..500, 0..20)) {
            let h = Harness::new(MockBoardSession::new());
            let (seen, handler) = recorder();
            h.ctrl.register_handler(handler);
            for &ply in &plies {
                h.ctrl.update(step(ply));
            }
            let expected: Vec<String> = std::iter::once(0)
                .chain(plies.iter().copied())
                .map(|ply| format!("fen-{ply}"))
                .collect();
            prop_assert_eq!(seen.borrow().clone(), expected);
        }
    }
}
