//! UCI notation helpers, including the `P@sq` drop form.

use cozy_chess::{File, Move, Piece, Rank, Square};

use crate::position::Position;
use chess_common::{format_piece, format_square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI moves the king two squares (e1g1); cozy_chess moves the king onto its
/// own rook (e1h1). Returns the move unchanged when it is not a castling move
/// or no matching legal move exists.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);

    if !(is_rank_1_or_8 && is_e_file) || mv.promotion.is_some() {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// The two-square king destination for a cozy_chess castling move, or `None`
/// if `mv` is not a castling move on `board`.
pub fn castling_king_target(board: &Position, mv: Move) -> Option<Square> {
    if board.piece_on(mv.from) != Some(Piece::King) {
        return None;
    }
    let mover = board.color_on(mv.from)?;
    if board.color_on(mv.to) != Some(mover) || board.piece_on(mv.to) != Some(Piece::Rook) {
        return None;
    }
    let file = if mv.to.file() as u8 > mv.from.file() as u8 {
        File::G
    } else {
        File::C
    };
    Some(Square::new(file, mv.from.rank()))
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Format a drop in UCI notation (e.g., "Q@e4")
pub fn format_uci_drop(piece: Piece, to: Square) -> String {
    format!(
        "{}@{}",
        format_piece(piece).to_ascii_uppercase(),
        format_square(to)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_format_uci_drop() {
        assert_eq!(
            format_uci_drop(Piece::Knight, Square::new(File::F, Rank::Third)),
            "N@f3"
        );
    }

    #[test]
    fn test_castling_both_directions() {
        let board = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let legal = board.legal_moves();
        let uci = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::G, Rank::First),
            promotion: None,
        };
        let cozy = convert_uci_castling_to_cozy(uci, &legal);
        assert_eq!(cozy.to, Square::new(File::H, Rank::First));
        assert_eq!(
            castling_king_target(&board, cozy),
            Some(Square::new(File::G, Rank::First))
        );

        let queenside = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::A, Rank::First),
            promotion: None,
        };
        assert_eq!(
            castling_king_target(&board, queenside),
            Some(Square::new(File::C, Rank::First))
        );
    }

    #[test]
    fn test_king_step_is_not_castling() {
        let board = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let step = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::F, Rank::First),
            promotion: None,
        };
        assert_eq!(castling_king_target(&board, step), None);
        assert_eq!(convert_uci_castling_to_cozy(step, &board.legal_moves()), step);
    }
}
