//! Collaborator interfaces the controller drives.

use chess::Pockets;
use cozy_chess::{Color, Piece, Square};

/// The board and game state the keyboard acts on.
///
/// Implementations own selection, occupancy and move submission; the
/// controller reads through to them on every call and keeps no copy.
pub trait BoardSession {
    /// Handle to the game clock, passed through to the parser untouched.
    type Clock: Clone;

    /// Currently selected square, if any.
    fn selected(&self) -> Option<Square>;

    /// Abort any in-progress move gesture and clear the selection.
    fn cancel_move(&mut self);

    /// Select a square. With `force` set, selecting while another square is
    /// selected completes a move when the pair is legal, as a second click
    /// would.
    fn select_square(&mut self, square: Square, force: bool);

    /// Piece standing on `square`.
    fn piece_on(&self, square: Square) -> Option<(Piece, Color)>;

    /// Show a new piece on the board ahead of submitting it.
    fn new_piece(&mut self, piece: Piece, color: Color, square: Square);

    /// Submit a drop. `premove` is false for drops committed now.
    fn send_new_piece(&mut self, piece: Piece, square: Square, premove: bool);

    /// Submit the staged move (`confirm == true`) or discard it.
    fn submit_move(&mut self, confirm: bool);

    /// Ply currently shown.
    fn ply(&self) -> u32;

    /// Show the position after `ply` plies.
    fn user_jump(&mut self, ply: u32);

    /// Color the keyboard user plays.
    fn player_color(&self) -> Color;

    /// Crazyhouse pockets, `None` when drops are not part of the game.
    fn pockets(&self) -> Option<&Pockets>;

    /// Variant rules check for dropping `piece` on `square`.
    fn drop_valid(&self, piece: Piece, square: Square) -> bool;

    fn clock(&self) -> Option<Self::Clock>;
}

/// Receives a resolved promotion choice.
pub trait Promotion {
    fn send_promotion(&mut self, orig: Square, dest: Square, piece: Piece, premove: bool);
}
