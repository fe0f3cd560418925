//! Mock BoardSession implementation for testing

use crate::session::{BoardSession, Promotion};
use chess::Pockets;
use cozy_chess::{Color, Piece, Square};
use std::collections::HashMap;

/// Recording board session - only compiled in test mode or with the mock
/// feature. Selection, occupancy and ply behave like a real board; every
/// mutating call is logged.
#[derive(Debug, Clone)]
pub struct MockBoardSession {
    selected: Option<Square>,
    pieces: HashMap<Square, (Piece, Color)>,
    pockets: Option<Pockets>,
    drops_allowed: bool,
    ply: u32,
    player_color: Color,
    clock: Option<u32>,
    call_log: Vec<MockCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CancelMove,
    SelectSquare {
        square: Square,
        force: bool,
    },
    NewPiece {
        piece: Piece,
        color: Color,
        square: Square,
    },
    SendNewPiece {
        piece: Piece,
        square: Square,
        premove: bool,
    },
    SubmitMove {
        confirm: bool,
    },
    UserJump {
        ply: u32,
    },
    SendPromotion {
        orig: Square,
        dest: Square,
        piece: Piece,
        premove: bool,
    },
}

impl Default for MockBoardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBoardSession {
    pub fn new() -> Self {
        Self {
            selected: None,
            pieces: HashMap::new(),
            pockets: None,
            drops_allowed: true,
            ply: 0,
            player_color: Color::White,
            clock: None,
            call_log: Vec::new(),
        }
    }

    pub fn with_selected(mut self, square: Square) -> Self {
        self.selected = Some(square);
        self
    }

    pub fn with_piece(mut self, square: Square, piece: Piece, color: Color) -> Self {
        self.pieces.insert(square, (piece, color));
        self
    }

    /// Enable drops with the given pockets.
    pub fn with_pockets(mut self, pockets: Pockets) -> Self {
        self.pockets = Some(pockets);
        self
    }

    /// Configure the answer of the drop legality check.
    pub fn with_drops_allowed(mut self, allowed: bool) -> Self {
        self.drops_allowed = allowed;
        self
    }

    pub fn with_ply(mut self, ply: u32) -> Self {
        self.ply = ply;
        self
    }

    pub fn with_player_color(mut self, color: Color) -> Self {
        self.player_color = color;
        self
    }

    /// Attach a clock, represented by its remaining seconds.
    pub fn with_clock(mut self, seconds: u32) -> Self {
        self.clock = Some(seconds);
        self
    }

    /// Get recorded calls for verification
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.clone()
    }

    /// Clear call history
    pub fn clear_calls(&mut self) {
        self.call_log.clear()
    }
}

impl BoardSession for MockBoardSession {
    type Clock = u32;

    fn selected(&self) -> Option<Square> {
        self.selected
    }

    fn cancel_move(&mut self) {
        self.call_log.push(MockCall::CancelMove);
        self.selected = None;
    }

    fn select_square(&mut self, square: Square, force: bool) {
        self.call_log.push(MockCall::SelectSquare { square, force });
        self.selected = Some(square);
    }

    fn piece_on(&self, square: Square) -> Option<(Piece, Color)> {
        self.pieces.get(&square).copied()
    }

    fn new_piece(&mut self, piece: Piece, color: Color, square: Square) {
        self.call_log.push(MockCall::NewPiece {
            piece,
            color,
            square,
        });
        self.pieces.insert(square, (piece, color));
    }

    fn send_new_piece(&mut self, piece: Piece, square: Square, premove: bool) {
        self.call_log.push(MockCall::SendNewPiece {
            piece,
            square,
            premove,
        });
        let color = self.player_color;
        if let Some(pockets) = self.pockets.as_mut() {
            pockets.take(color, piece);
        }
    }

    fn submit_move(&mut self, confirm: bool) {
        self.call_log.push(MockCall::SubmitMove { confirm });
    }

    fn ply(&self) -> u32 {
        self.ply
    }

    fn user_jump(&mut self, ply: u32) {
        self.call_log.push(MockCall::UserJump { ply });
        self.ply = ply;
    }

    fn player_color(&self) -> Color {
        self.player_color
    }

    fn pockets(&self) -> Option<&Pockets> {
        self.pockets.as_ref()
    }

    fn drop_valid(&self, _piece: Piece, _square: Square) -> bool {
        self.drops_allowed
    }

    fn clock(&self) -> Option<u32> {
        self.clock
    }
}

impl Promotion for MockBoardSession {
    fn send_promotion(&mut self, orig: Square, dest: Square, piece: Piece, premove: bool) {
        self.call_log.push(MockCall::SendPromotion {
            orig,
            dest,
            piece,
            premove,
        });
    }
}
