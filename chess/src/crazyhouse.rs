//! Crazyhouse pockets and drop rules.
//!
//! Captured pieces go to the capturer's pocket and can later be dropped on any
//! empty square instead of making a move.

use cozy_chess::{Color, Piece, Rank, Square};

use crate::fen::FenError;
use crate::position::Position;
use chess_common::{color_name, format_square, parse_piece};

const PIECE_KINDS: usize = 6;

/// Per-color count of droppable pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pockets {
    counts: [[u8; PIECE_KINDS]; 2],
}

impl Pockets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly useful for setting up positions.
    pub fn with(mut self, color: Color, piece: Piece, count: u8) -> Self {
        self.counts[color as usize][piece as usize] = count;
        self
    }

    pub fn count(&self, color: Color, piece: Piece) -> u8 {
        self.counts[color as usize][piece as usize]
    }

    pub fn add(&mut self, color: Color, piece: Piece) {
        let slot = &mut self.counts[color as usize][piece as usize];
        *slot = slot.saturating_add(1);
    }

    /// Remove one piece from the pocket. Returns false if none was left.
    pub fn take(&mut self, color: Color, piece: Piece) -> bool {
        let slot = &mut self.counts[color as usize][piece as usize];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(&self, color: Color) -> u32 {
        self.counts[color as usize].iter().map(|&c| u32::from(c)).sum()
    }

    /// Non-empty pocket entries for one side, in piece order.
    pub fn contents(&self, color: Color) -> impl Iterator<Item = (Piece, u8)> + '_ {
        Piece::ALL
            .into_iter()
            .map(move |piece| (piece, self.count(color, piece)))
            .filter(|&(_, count)| count > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropError {
    #[error("It is not {}'s turn", color_name(*.0))]
    NotYourTurn(Color),
    #[error("No {0:?} left in the pocket")]
    EmptyPocket(Piece),
    #[error("Square {} is occupied", format_square(*.0))]
    Occupied(Square),
    #[error("Pawns cannot be dropped on the first or last rank")]
    PawnOnBackRank,
    #[error("Drop leaves the king in check")]
    LeavesKingInCheck,
}

/// Check a drop by the side to move and return the resulting position.
///
/// The side to move flips, en passant is cleared, the halfmove clock resets
/// and castling rights carry over untouched. Material limits of standard chess
/// do not apply.
pub fn validate_drop(
    position: &Position,
    pockets: &Pockets,
    piece: Piece,
    to: Square,
) -> Result<Position, DropError> {
    let color = position.side_to_move();

    if pockets.count(color, piece) == 0 {
        return Err(DropError::EmptyPocket(piece));
    }
    if position.occupied().has(to) {
        return Err(DropError::Occupied(to));
    }
    if piece == Piece::Pawn && matches!(to.rank(), Rank::First | Rank::Eighth) {
        return Err(DropError::PawnOnBackRank);
    }

    let mut next = position.clone();
    next.drop_unchecked(piece, to);
    // A drop can only block a check, never uncover one.
    if !next.king_safe(color) {
        return Err(DropError::LeavesKingInCheck);
    }
    Ok(next)
}

/// Split a crazyhouse FEN that carries the pockets in brackets after the
/// placement (`.../RNBQKBNR[Qn] w ...`) into a plain FEN and the pockets.
/// Uppercase letters are white's pieces. Returns `None` pockets when the FEN
/// has no bracket section.
pub fn split_pocket_fen(fen: &str) -> Result<(String, Option<Pockets>), FenError> {
    let Some(open) = fen.find('[') else {
        return Ok((fen.to_string(), None));
    };
    let close = fen[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or(FenError::InvalidFormat)?;

    let mut pockets = Pockets::new();
    for c in fen[open + 1..close].chars() {
        let piece = parse_piece(c).ok_or(FenError::InvalidPiece(c))?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        pockets.add(color, piece);
    }

    let plain = format!("{}{}", &fen[..open], &fen[close + 1..]);
    Ok((plain, Some(pockets)))
}
