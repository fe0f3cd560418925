//! Shared value types for positions and plies.

use cozy_chess::{BitBoard, Move, Piece, Square};
use std::collections::HashMap;

/// Legal destinations keyed by origin square.
///
/// Castling appears under the king's origin both as the king's two-square
/// destination and as the rook's square.
pub type Dests = HashMap<Square, BitBoard>;

/// What a single ply did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyAction {
    Move(Move),
    Drop { piece: Piece, to: Square },
}

impl PlyAction {
    /// The square the ply ends on.
    pub fn to(&self) -> Square {
        match self {
            Self::Move(mv) => mv.to,
            Self::Drop { to, .. } => *to,
        }
    }
}
