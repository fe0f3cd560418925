//! Attaching the text parser.
//!
//! The parser is built late, by a factory that becomes available when its
//! loader resolves. It gets a [`ParserOpts`] bundle: the host's input surface
//! plus the controller capabilities it may call, and returns the callback the
//! controller should feed positions to.

use std::future::Future;

use chess::Dests;
use cozy_chess::Square;
use tracing::{info, warn};

use crate::controller::KeyboardMove;
use crate::error::LoadError;
use crate::session::BoardSession;

/// Everything a parser is constructed from.
pub struct ParserOpts<S: BoardSession, I> {
    /// The focus-capturing input surface provided by the host.
    pub input: I,
    ctrl: KeyboardMove<S>,
}

impl<S: BoardSession, I> ParserOpts<S, I> {
    pub fn new(input: I, ctrl: KeyboardMove<S>) -> Self {
        Self { input, ctrl }
    }

    pub fn set_focus(&self, focus: bool) {
        self.ctrl.set_focus(focus);
    }

    pub fn select(&self, square: Square) {
        self.ctrl.select(square);
    }

    pub fn has_selected(&self) -> Option<Square> {
        self.ctrl.has_selected()
    }

    pub fn confirm_move(&self) {
        self.ctrl.confirm_move();
    }

    pub fn san(&self, orig: Square, dest: Square) {
        self.ctrl.san(orig, dest);
    }

    pub fn drop(&self, square: Square, piece: &str) {
        self.ctrl.drop(square, piece);
    }

    pub fn promote(&self, orig: Square, dest: Square, piece: &str) {
        self.ctrl.promote(orig, dest, piece);
    }

    pub fn jump(&self, delta: i32) {
        self.ctrl.jump(delta);
    }

    pub fn clock(&self) -> Option<S::Clock> {
        self.ctrl.clock()
    }
}

impl<S: BoardSession, I: Clone> Clone for ParserOpts<S, I> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            ctrl: self.ctrl.clone(),
        }
    }
}

/// Wait for the parser factory, build the parser and register its callback.
///
/// Positions keep buffering in the controller while `loader` is pending. On a
/// load failure nothing is registered and the controller keeps buffering.
pub async fn attach_parser<S, I, L, F, H>(
    ctrl: &KeyboardMove<S>,
    input: I,
    loader: L,
) -> Result<(), LoadError>
where
    S: BoardSession,
    L: Future<Output = Result<F, LoadError>>,
    F: FnOnce(ParserOpts<S, I>) -> H,
    H: Fn(&str, Option<&Dests>) + 'static,
{
    let factory = match loader.await {
        Ok(factory) => factory,
        Err(err) => {
            warn!(%err, "keyboard move parser failed to load");
            return Err(err);
        }
    };

    let handler = factory(ParserOpts::new(input, ctrl.clone()));
    ctrl.register_handler(handler);
    info!("keyboard move parser attached");
    Ok(())
}
