use cozy_chess::{BitBoard, Color, GameStatus, Move, Piece, Square};

use crate::crazyhouse::{self, DropError, Pockets};
use crate::fen::{self, FenError, STARTING_FEN};
use crate::position::Position;
use crate::types::{Dests, PlyAction};
use crate::uci;

/// Game state: the current position with ply history and optional
/// crazyhouse pockets.
#[derive(Debug, Clone)]
pub struct Game {
    position: Position,
    start_fen: String,
    history: Vec<HistoryEntry>,
    pockets: Option<Pockets>,
    /// Squares holding promoted pieces, which go back to a pocket as pawns.
    promoted: BitBoard,
}

/// One played ply.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action: PlyAction,
    pub color: Color,
    pub captured: Option<Piece>,
    pub uci: String,
    /// FEN after this ply
    pub fen: String,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self {
            position: Position::default(),
            start_fen: STARTING_FEN.to_string(),
            history: Vec::new(),
            pockets: None,
            promoted: BitBoard::EMPTY,
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = fen::parse_fen(fen)?;
        Ok(Self {
            start_fen: position.to_string(),
            position,
            history: Vec::new(),
            pockets: None,
            promoted: BitBoard::EMPTY,
        })
    }

    /// Create a crazyhouse game. Pockets may be given in brackets after the
    /// placement field; without them both pockets start empty.
    pub fn from_crazyhouse_fen(fen: &str) -> Result<Self, GameError> {
        let (plain, pockets) = crazyhouse::split_pocket_fen(fen)?;
        Ok(Self::from_fen(&plain)?.with_pockets(pockets.unwrap_or_default()))
    }

    /// Enable crazyhouse rules with the given starting pockets.
    pub fn with_pockets(mut self, pockets: Pockets) -> Self {
        self.pockets = Some(pockets);
        self
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn pockets(&self) -> Option<&Pockets> {
        self.pockets.as_ref()
    }

    pub fn is_crazyhouse(&self) -> bool {
        self.pockets.is_some()
    }

    /// Number of plies played so far.
    pub fn ply(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn promoted(&self) -> BitBoard {
        self.promoted
    }

    /// Game status. In crazyhouse a position without legal moves is not over
    /// while a drop can still answer it.
    pub fn status(&self) -> GameStatus {
        let status = self.position.status();
        if status != GameStatus::Ongoing
            && self.position.halfmove_clock() < 100
            && self.has_legal_drop()
        {
            return GameStatus::Ongoing;
        }
        status
    }

    fn has_legal_drop(&self) -> bool {
        let Some(pockets) = &self.pockets else {
            return false;
        };
        let empty = !self.position.occupied();
        pockets
            .contents(self.side_to_move())
            .any(|(piece, _)| {
                empty
                    .into_iter()
                    .any(|to| crazyhouse::validate_drop(&self.position, pockets, piece, to).is_ok())
            })
    }

    pub fn to_fen(&self) -> String {
        self.position.to_string()
    }

    /// FEN of the position after `ply` plies, `0` being the start position.
    pub fn fen_at(&self, ply: u32) -> Option<&str> {
        match ply {
            0 => Some(&self.start_fen),
            n => self.history.get(n as usize - 1).map(|e| e.fen.as_str()),
        }
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves()
    }

    /// Legal destinations per origin square. Castling is listed both under the
    /// king's two-square destination and under the rook's square.
    pub fn dests(&self) -> Dests {
        let mut dests = Dests::new();
        for mv in self.legal_moves() {
            let entry = dests.entry(mv.from).or_insert(BitBoard::EMPTY);
            *entry |= mv.to.bitboard();
            if let Some(king_to) = uci::castling_king_target(&self.position, mv) {
                *entry |= king_to.bitboard();
            }
        }
        dests
    }

    /// Resolve an origin/destination pair to a legal move. Two-square king
    /// moves are accepted for castling.
    pub fn find_move(&self, from: Square, to: Square, promotion: Option<Piece>) -> Option<Move> {
        let legal = self.legal_moves();
        let mv = uci::convert_uci_castling_to_cozy(
            Move {
                from,
                to,
                promotion,
            },
            &legal,
        );
        legal.contains(&mv).then_some(mv)
    }

    /// Whether moving from `from` to `to` needs a promotion piece.
    pub fn needs_promotion(&self, from: Square, to: Square) -> bool {
        self.legal_moves()
            .iter()
            .any(|mv| mv.from == from && mv.to == to && mv.promotion.is_some())
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<&HistoryEntry, GameError> {
        if !self.position.is_legal(mv) {
            return Err(GameError::IllegalMove);
        }

        let color = self.position.side_to_move();
        let piece = self
            .position
            .piece_on(mv.from)
            .ok_or(GameError::IllegalMove)?;
        let captured = self.captured_by(mv, piece, color);
        let pocketed = captured.map(|piece| {
            if self.promoted.has(mv.to) {
                Piece::Pawn
            } else {
                piece
            }
        });
        let castles = self.position.color_on(mv.to) == Some(color);

        self.position.play_unchecked(mv);
        if !castles {
            let carries_promotion = self.promoted.has(mv.from) || mv.promotion.is_some();
            self.promoted &= !(mv.from.bitboard() | mv.to.bitboard());
            if carries_promotion {
                self.promoted |= mv.to.bitboard();
            }
        }

        if let (Some(pockets), Some(pocketed)) = (self.pockets.as_mut(), pocketed) {
            pockets.add(color, pocketed);
        }

        Ok(self.push_entry(PlyAction::Move(mv), color, captured, uci::format_uci_move(mv)))
    }

    /// Check whether `color` may drop `piece` on `to` right now.
    pub fn check_drop(
        &self,
        color: Color,
        piece: Piece,
        to: Square,
    ) -> Result<Position, GameError> {
        let pockets = self.pockets.as_ref().ok_or(GameError::NotCrazyhouse)?;
        if color != self.position.side_to_move() {
            return Err(DropError::NotYourTurn(color).into());
        }
        Ok(crazyhouse::validate_drop(&self.position, pockets, piece, to)?)
    }

    /// Drop a piece from the side to move's pocket.
    pub fn drop_piece(&mut self, piece: Piece, to: Square) -> Result<&HistoryEntry, GameError> {
        let color = self.position.side_to_move();
        let next = self.check_drop(color, piece, to)?;

        if let Some(pockets) = self.pockets.as_mut() {
            pockets.take(color, piece);
        }
        self.position = next;

        Ok(self.push_entry(
            PlyAction::Drop { piece, to },
            color,
            None,
            uci::format_uci_drop(piece, to),
        ))
    }

    fn captured_by(&self, mv: Move, piece: Piece, color: Color) -> Option<Piece> {
        match self.position.color_on(mv.to) {
            // Castling is encoded as the king moving onto its own rook.
            Some(c) if c == color => None,
            Some(_) => self.position.piece_on(mv.to),
            // En passant: a pawn changing file onto an empty square.
            None if piece == Piece::Pawn && mv.from.file() != mv.to.file() => Some(Piece::Pawn),
            None => None,
        }
    }

    fn push_entry(
        &mut self,
        action: PlyAction,
        color: Color,
        captured: Option<Piece>,
        uci: String,
    ) -> &HistoryEntry {
        tracing::debug!(%uci, ply = self.history.len() + 1, "ply played");
        self.history.push(HistoryEntry {
            action,
            color,
            captured,
            uci,
            fen: self.to_fen(),
        });
        &self.history[self.history.len() - 1]
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Drops are only possible in crazyhouse games")]
    NotCrazyhouse,
    #[error("Illegal drop: {0}")]
    Drop(#[from] DropError),
    #[error("FEN parse error: {0}")]
    FenError(#[from] FenError),
}
