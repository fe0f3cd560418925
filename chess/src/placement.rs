//! Editable piece placement, the first field of a FEN record.
//!
//! Used to read and write that field and to draw boards that show more than
//! the position itself (a drop that is not yet submitted).

use cozy_chess::{Color, Square};

use crate::fen::FenError;
use chess_common::{fen_piece_char, parse_piece};

type Occupant = (cozy_chess::Piece, Color);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    squares: [Option<Occupant>; 64],
}

impl Placement {
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
        }
    }

    /// Parse the placement field from a full FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let field = fen.split_whitespace().next().ok_or(FenError::InvalidFormat)?;

        let mut squares = [None; 64];
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::InvalidBoardLayout);
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    if file > 7 {
                        return Err(FenError::InvalidBoardLayout);
                    }
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let piece = parse_piece(c).ok_or(FenError::InvalidPiece(c))?;
                    squares[rank * 8 + file] = Some((piece, color));
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::InvalidBoardLayout);
            }
        }

        Ok(Self { squares })
    }

    pub fn piece_at(&self, sq: Square) -> Option<Occupant> {
        self.squares[sq as usize]
    }

    pub fn set(&mut self, sq: Square, occupant: Option<Occupant>) {
        self.squares[sq as usize] = occupant;
    }

    /// Render back to a FEN placement field.
    pub fn to_fen_field(&self) -> String {
        let mut out = String::with_capacity(71);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    Some((piece, color)) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(fen_piece_char(piece, color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }
}
