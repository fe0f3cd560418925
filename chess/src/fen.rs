use crate::position::Position;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Position
pub fn parse_fen(fen: &str) -> Result<Position, FenError> {
    Position::from_fen(fen)
}

/// The six whitespace-separated fields of a FEN record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenFields<'a> {
    pub placement: &'a str,
    pub side_to_move: &'a str,
    pub castling: &'a str,
    pub en_passant: &'a str,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl<'a> FenFields<'a> {
    pub fn split(fen: &'a str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        let [placement, side_to_move, castling, en_passant, halfmove, fullmove] = parts[..] else {
            return Err(FenError::InvalidFormat);
        };
        Ok(Self {
            placement,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock: halfmove.parse().map_err(|_| FenError::InvalidFormat)?,
            fullmove_number: fullmove.parse().map_err(|_| FenError::InvalidFormat)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
    #[error("Invalid piece character: {0}")]
    InvalidPiece(char),
    #[error("FEN describes an impossible position")]
    InvalidPosition,
}
