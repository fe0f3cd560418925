//! Board state that tolerates crazyhouse material.
//!
//! cozy-chess only builds boards reachable in standard chess (at most eight
//! pawns and sixteen pieces a side), and drops routinely break both limits.
//! `Position` keeps its own bitboards and generates moves from the cozy-chess
//! attack tables instead, using the same move encoding: castling is the king
//! moving onto its own rook.

use std::fmt;
use std::str::FromStr;

use cozy_chess::{
    get_between_rays, get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks,
    get_pawn_quiets, get_rook_moves, BitBoard, CastleRights, Color, File, GameStatus, Move, Piece,
    Rank, Square,
};

use crate::fen::{FenError, FenFields};
use crate::placement::Placement;
use chess_common::{file_to_char, parse_square};

const PROMOTIONS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

const BACK_RANK: [Piece; 8] = [
    Piece::Rook,
    Piece::Knight,
    Piece::Bishop,
    Piece::Queen,
    Piece::King,
    Piece::Bishop,
    Piece::Knight,
    Piece::Rook,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pieces: [BitBoard; 6],
    colors: [BitBoard; 2],
    side_to_move: Color,
    castling: [CastleRights; 2],
    en_passant: Option<File>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Position {
    fn empty() -> Self {
        Self {
            pieces: [BitBoard::EMPTY; 6],
            colors: [BitBoard::EMPTY; 2],
            side_to_move: Color::White,
            castling: [CastleRights::EMPTY; 2],
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse and validate a FEN record.
    ///
    /// Each side needs exactly one king, pawns may not stand on the first or
    /// last rank and the side that just moved may not be in check. Piece counts
    /// are not limited.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields = FenFields::split(fen)?;
        let placement = Placement::from_fen(fields.placement)?;

        let mut position = Self::empty();
        for square in Square::ALL {
            if let Some((piece, color)) = placement.piece_at(square) {
                position.put(square, piece, color);
            }
        }
        position.side_to_move = match fields.side_to_move {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::InvalidFormat),
        };
        position.castling = parse_castling(fields.castling)?;
        position.en_passant = match fields.en_passant {
            "-" => None,
            square => {
                let square = parse_square(square).ok_or(FenError::InvalidFormat)?;
                if square.rank() != Rank::Sixth.relative_to(position.side_to_move) {
                    return Err(FenError::InvalidPosition);
                }
                Some(square.file())
            }
        };
        position.halfmove_clock = fields.halfmove_clock;
        position.fullmove_number = fields.fullmove_number.max(1);

        if !position.is_valid() {
            return Err(FenError::InvalidPosition);
        }
        Ok(position)
    }

    fn is_valid(&self) -> bool {
        let no_pawns = Rank::First.bitboard() | Rank::Eighth.bitboard();
        if !(self.pieces(Piece::Pawn) & no_pawns).is_empty() {
            return false;
        }
        for color in Color::ALL {
            if self.colored_pieces(color, Piece::King).len() != 1 {
                return false;
            }
        }
        if !self.king_safe(!self.side_to_move) {
            return false;
        }

        for color in Color::ALL {
            let rights = self.castling[color as usize];
            if rights.short.is_none() && rights.long.is_none() {
                continue;
            }
            let back_rank = Rank::First.relative_to(color);
            let Some(king) = self.king(color).filter(|king| king.rank() == back_rank) else {
                return false;
            };
            let rooks = self.colored_pieces(color, Piece::Rook);
            if let Some(file) = rights.short {
                if !rooks.has(Square::new(file, back_rank)) || file < king.file() {
                    return false;
                }
            }
            if let Some(file) = rights.long {
                if !rooks.has(Square::new(file, back_rank)) || file > king.file() {
                    return false;
                }
            }
        }

        if let Some(file) = self.en_passant {
            let them = !self.side_to_move;
            let pushed = Square::new(file, Rank::Fourth.relative_to(them));
            let skipped = Square::new(file, Rank::Third.relative_to(them));
            let origin = Square::new(file, Rank::Second.relative_to(them));
            if !self.colored_pieces(them, Piece::Pawn).has(pushed)
                || self.occupied().has(skipped)
                || self.occupied().has(origin)
            {
                return false;
            }
        }
        true
    }

    pub fn pieces(&self, piece: Piece) -> BitBoard {
        self.pieces[piece as usize]
    }

    pub fn colors(&self, color: Color) -> BitBoard {
        self.colors[color as usize]
    }

    pub fn colored_pieces(&self, color: Color, piece: Piece) -> BitBoard {
        self.pieces(piece) & self.colors(color)
    }

    pub fn occupied(&self) -> BitBoard {
        self.colors[0] | self.colors[1]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castle_rights(&self, color: Color) -> &CastleRights {
        &self.castling[color as usize]
    }

    pub fn en_passant(&self) -> Option<File> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        Piece::ALL
            .into_iter()
            .find(|&piece| self.pieces(piece).has(square))
    }

    pub fn color_on(&self, square: Square) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&color| self.colors(color).has(square))
    }

    pub fn king(&self, color: Color) -> Option<Square> {
        self.colored_pieces(color, Piece::King).next_square()
    }

    /// Pieces of `by` attacking `square`, with sliders blocked by `occupied`.
    fn attackers_with(&self, square: Square, by: Color, occupied: BitBoard) -> BitBoard {
        let diagonal = self.pieces(Piece::Bishop) | self.pieces(Piece::Queen);
        let straight = self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
        let attackers = (get_knight_moves(square) & self.pieces(Piece::Knight))
            | (get_king_moves(square) & self.pieces(Piece::King))
            | (get_pawn_attacks(square, !by) & self.pieces(Piece::Pawn))
            | (get_bishop_moves(square, occupied) & diagonal)
            | (get_rook_moves(square, occupied) & straight);
        attackers & self.colors(by)
    }

    pub fn attackers(&self, square: Square, by: Color) -> BitBoard {
        self.attackers_with(square, by, self.occupied())
    }

    /// Pieces giving check to the side to move.
    pub fn checkers(&self) -> BitBoard {
        let us = self.side_to_move;
        self.king(us)
            .map_or(BitBoard::EMPTY, |king| self.attackers(king, !us))
    }

    pub fn in_check(&self) -> bool {
        !self.checkers().is_empty()
    }

    /// Whether `color`'s king is out of reach of the opponent.
    pub(crate) fn king_safe(&self, color: Color) -> bool {
        self.king(color)
            .map_or(true, |king| self.attackers(king, !color).is_empty())
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let us = self.side_to_move;
        let mut moves = Vec::new();
        self.pseudo_legal_moves(&mut moves);
        moves.retain(|&mv| {
            let mut next = self.clone();
            next.play_unchecked(mv);
            next.king_safe(us)
        });
        self.castling_moves(&mut moves);
        moves
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }

    fn pseudo_legal_moves(&self, moves: &mut Vec<Move>) {
        let us = self.side_to_move;
        let own = self.colors(us);
        let theirs = self.colors(!us);
        let occupied = own | theirs;
        let capturable = match self.en_passant {
            Some(file) => theirs | Square::new(file, Rank::Sixth.relative_to(us)).bitboard(),
            None => theirs,
        };
        let promotion_rank = Rank::Eighth.relative_to(us);

        for from in own {
            let Some(piece) = self.piece_on(from) else {
                continue;
            };
            let targets = match piece {
                Piece::Pawn => {
                    get_pawn_quiets(from, us, occupied) | (get_pawn_attacks(from, us) & capturable)
                }
                Piece::Knight => get_knight_moves(from) & !own,
                Piece::Bishop => get_bishop_moves(from, occupied) & !own,
                Piece::Rook => get_rook_moves(from, occupied) & !own,
                Piece::Queen => {
                    (get_bishop_moves(from, occupied) | get_rook_moves(from, occupied)) & !own
                }
                Piece::King => get_king_moves(from) & !own,
            };
            for to in targets {
                if piece == Piece::Pawn && to.rank() == promotion_rank {
                    moves.extend(PROMOTIONS.iter().map(|&promotion| Move {
                        from,
                        to,
                        promotion: Some(promotion),
                    }));
                } else {
                    moves.push(Move {
                        from,
                        to,
                        promotion: None,
                    });
                }
            }
        }
    }

    fn castling_moves(&self, moves: &mut Vec<Move>) {
        let us = self.side_to_move;
        let Some(king) = self.king(us) else {
            return;
        };
        if self.in_check() {
            return;
        }
        let back_rank = Rank::First.relative_to(us);
        let rights = self.castling[us as usize];
        let without_king = self.occupied() & !king.bitboard();

        for (rook_file, king_file, rook_to_file) in [
            (rights.short, File::G, File::F),
            (rights.long, File::C, File::D),
        ] {
            let Some(rook_file) = rook_file else {
                continue;
            };
            let rook = Square::new(rook_file, back_rank);
            if !self.colored_pieces(us, Piece::Rook).has(rook) {
                continue;
            }
            let king_to = Square::new(king_file, back_rank);
            let rook_to = Square::new(rook_to_file, back_rank);

            let movers = king.bitboard() | rook.bitboard();
            let needs_empty =
                get_between_rays(king, rook) | king_to.bitboard() | rook_to.bitboard();
            if !(needs_empty & self.occupied() & !movers).is_empty() {
                continue;
            }
            let king_path = get_between_rays(king, king_to) | king_to.bitboard();
            let attacked = king_path
                .into_iter()
                .any(|square| !self.attackers_with(square, !us, without_king).is_empty());
            if attacked {
                continue;
            }
            moves.push(Move {
                from: king,
                to: rook,
                promotion: None,
            });
        }
    }

    /// Play a move without checking it. Only moves from
    /// [`Position::legal_moves`] keep the position consistent.
    pub fn play_unchecked(&mut self, mv: Move) {
        let us = self.side_to_move;
        let Some(moved) = self.piece_on(mv.from) else {
            return;
        };
        let castles = self.colors(us).has(mv.to);
        let captures = !castles && self.occupied().has(mv.to);
        let back_rank = Rank::First.relative_to(us);
        let mut en_passant = None;

        if moved == Piece::Pawn || captures {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if castles {
            let (king_file, rook_file) = if mv.to.file() > mv.from.file() {
                (File::G, File::F)
            } else {
                (File::C, File::D)
            };
            self.remove(mv.from);
            self.remove(mv.to);
            self.put(Square::new(king_file, back_rank), Piece::King, us);
            self.put(Square::new(rook_file, back_rank), Piece::Rook, us);
            self.castling[us as usize] = CastleRights::EMPTY;
        } else {
            if moved == Piece::Pawn {
                if !captures && mv.from.file() != mv.to.file() {
                    self.remove(Square::new(mv.to.file(), mv.from.rank()));
                }
                if mv.from.rank() == Rank::Second.relative_to(us)
                    && mv.to.rank() == Rank::Fourth.relative_to(us)
                {
                    en_passant = Some(mv.to.file());
                }
            }
            if moved == Piece::King {
                self.castling[us as usize] = CastleRights::EMPTY;
            }
            self.remove(mv.from);
            self.remove(mv.to);
            self.put(mv.to, mv.promotion.unwrap_or(moved), us);
            self.revoke_castling(us, mv.from);
            self.revoke_castling(!us, mv.to);
        }

        self.en_passant = en_passant;
        self.pass_turn();
    }

    /// Put `piece` for the side to move on `to` and pass the turn. The caller
    /// checks that the square is empty and the drop is allowed.
    pub fn drop_unchecked(&mut self, piece: Piece, to: Square) {
        self.put(to, piece, self.side_to_move);
        self.halfmove_clock = 0;
        self.en_passant = None;
        self.pass_turn();
    }

    /// Game status ignoring drops: no legal move is mate or stalemate, and
    /// the fifty-move rule draws.
    pub fn status(&self) -> GameStatus {
        if !self.legal_moves().is_empty() {
            if self.halfmove_clock < 100 {
                GameStatus::Ongoing
            } else {
                GameStatus::Drawn
            }
        } else if self.in_check() {
            GameStatus::Won
        } else {
            GameStatus::Drawn
        }
    }

    fn pass_turn(&mut self) {
        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = !self.side_to_move;
    }

    fn revoke_castling(&mut self, color: Color, square: Square) {
        if square.rank() != Rank::First.relative_to(color) {
            return;
        }
        let rights = &mut self.castling[color as usize];
        if rights.short == Some(square.file()) {
            rights.short = None;
        }
        if rights.long == Some(square.file()) {
            rights.long = None;
        }
    }

    fn put(&mut self, square: Square, piece: Piece, color: Color) {
        self.pieces[piece as usize] |= square.bitboard();
        self.colors[color as usize] |= square.bitboard();
    }

    fn remove(&mut self, square: Square) {
        let keep = !square.bitboard();
        for bb in self.pieces.iter_mut().chain(self.colors.iter_mut()) {
            *bb &= keep;
        }
    }

    fn placement(&self) -> Placement {
        let mut placement = Placement::empty();
        for square in self.occupied() {
            if let (Some(piece), Some(color)) = (self.piece_on(square), self.color_on(square)) {
                placement.set(square, Some((piece, color)));
            }
        }
        placement
    }
}

impl Default for Position {
    /// The standard starting position.
    fn default() -> Self {
        let mut position = Self::empty();
        for (file, piece) in File::ALL.into_iter().zip(BACK_RANK) {
            position.put(Square::new(file, Rank::First), piece, Color::White);
            position.put(Square::new(file, Rank::Second), Piece::Pawn, Color::White);
            position.put(Square::new(file, Rank::Seventh), Piece::Pawn, Color::Black);
            position.put(Square::new(file, Rank::Eighth), piece, Color::Black);
        }
        let rights = CastleRights {
            short: Some(File::H),
            long: Some(File::A),
        };
        position.castling = [rights; 2];
        position
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Position {
    /// Writes the position as FEN.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        write!(f, "{} {} ", self.placement().to_fen_field(), side)?;

        let mut castling = String::new();
        for (color, short, long) in [(Color::White, 'K', 'Q'), (Color::Black, 'k', 'q')] {
            let rights = self.castling[color as usize];
            if rights.short.is_some() {
                castling.push(short);
            }
            if rights.long.is_some() {
                castling.push(long);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        write!(f, "{castling} ")?;

        match self.en_passant {
            Some(file) => {
                let rank = match self.side_to_move {
                    Color::White => '6',
                    Color::Black => '3',
                };
                write!(f, "{}{} ", file_to_char(file), rank)?;
            }
            None => write!(f, "- ")?,
        }
        write!(f, "{} {}", self.halfmove_clock, self.fullmove_number)
    }
}

fn parse_castling(field: &str) -> Result<[CastleRights; 2], FenError> {
    let mut rights = [CastleRights::EMPTY; 2];
    if field == "-" {
        return Ok(rights);
    }
    for c in field.chars() {
        match c {
            'K' => rights[Color::White as usize].short = Some(File::H),
            'Q' => rights[Color::White as usize].long = Some(File::A),
            'k' => rights[Color::Black as usize].short = Some(File::H),
            'q' => rights[Color::Black as usize].long = Some(File::A),
            _ => return Err(FenError::InvalidFormat),
        }
    }
    Ok(rights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::STARTING_FEN;
    use cozy_chess::Board;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    fn mv(uci: &str) -> Move {
        uci.parse().unwrap()
    }

    fn sorted(mut moves: Vec<Move>) -> Vec<String> {
        moves.sort_by_key(|mv| (mv.from as u8, mv.to as u8, mv.promotion.map(|p| p as u8)));
        moves.into_iter().map(|mv| mv.to_string()).collect()
    }

    fn cozy_moves(board: &Board) -> Vec<Move> {
        let mut moves = Vec::new();
        board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    fn perft(position: &Position, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        position
            .legal_moves()
            .into_iter()
            .map(|mv| {
                let mut next = position.clone();
                next.play_unchecked(mv);
                perft(&next, depth - 1)
            })
            .sum()
    }

    #[test]
    fn test_default_is_starting_position() {
        assert_eq!(Position::default().to_string(), STARTING_FEN);
        assert_eq!(Position::from_fen(STARTING_FEN).unwrap(), Position::default());
    }

    #[test]
    fn test_fen_round_trip() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
            "8/8/8/8/8/8/8/K6k b - - 42 77",
        ] {
            assert_eq!(Position::from_fen(fen).unwrap().to_string(), fen);
        }
    }

    #[test]
    fn test_rejects_broken_positions() {
        for fen in [
            // No black king.
            "8/8/8/8/8/8/8/4K3 w - - 0 1",
            // Pawn on the back rank.
            "P3k3/8/8/8/8/8/8/4K3 w - - 0 1",
            // White just moved and left its king in check.
            "4k3/8/8/8/8/8/8/4K2r b - - 0 1",
            // Castling right without the rook.
            "4k3/8/8/8/8/8/8/4K3 w K - 0 1",
            // En passant without a pushed pawn.
            "4k3/8/8/8/8/8/8/4K3 w - e6 0 1",
        ] {
            assert_eq!(Position::from_fen(fen), Err(FenError::InvalidPosition), "{fen}");
        }
    }

    #[test]
    fn test_accepts_crazyhouse_material() {
        let fen = "4k3/8/8/8/4P3/8/PPPPPPPP/RNBQKBNR w - - 0 1";
        let position = Position::from_fen(fen).unwrap();
        assert_eq!(position.colored_pieces(Color::White, Piece::Pawn).len(), 9);
        assert!(fen.parse::<Board>().is_err());
        assert!(!position.legal_moves().is_empty());
    }

    #[test]
    fn test_perft_start_position() {
        let position = Position::default();
        assert_eq!(perft(&position, 1), 20);
        assert_eq!(perft(&position, 2), 400);
        assert_eq!(perft(&position, 3), 8902);
    }

    #[test]
    fn test_perft_kiwipete() {
        let position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&position, 1), 48);
        assert_eq!(perft(&position, 2), 2039);
    }

    #[test]
    fn test_perft_en_passant_pins() {
        // Position 3 of the usual perft suite: pins along the rank through
        // an en passant capture.
        let position = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&position, 1), 14);
        assert_eq!(perft(&position, 2), 191);
        assert_eq!(perft(&position, 3), 2812);
    }

    #[test]
    fn test_castling_both_sides() {
        let mut position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let moves = position.legal_moves();
        assert!(moves.contains(&mv("e1h1")));
        assert!(moves.contains(&mv("e1a1")));

        position.play_unchecked(mv("e1h1"));
        assert_eq!(position.to_string(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");
    }

    #[test]
    fn test_no_castling_through_attack() {
        // The bishop on c4 covers f1.
        let position = Position::from_fen("4k3/8/8/8/2b5/8/8/R3K2R w KQ - 0 1").unwrap();
        let moves = position.legal_moves();
        assert!(!moves.contains(&mv("e1h1")));
        assert!(moves.contains(&mv("e1a1")));
    }

    #[test]
    fn test_rook_capture_revokes_castling() {
        let mut position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        position.play_unchecked(mv("h1h8"));
        assert_eq!(position.castle_rights(Color::Black).short, None);
        assert_eq!(position.castle_rights(Color::Black).long, Some(File::A));
        assert_eq!(position.castle_rights(Color::White).short, None);
    }

    #[test]
    fn test_en_passant_capture_removes_pawn() {
        let mut position = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        position.play_unchecked(mv("e5d6"));
        assert_eq!(position.piece_on(sq("d5")), None);
        assert_eq!(position.piece_on(sq("d6")), Some(Piece::Pawn));
        assert_eq!(position.en_passant(), None);
    }

    #[test]
    fn test_promotions_offer_four_pieces() {
        let position = Position::from_fen("8/4P3/8/8/8/8/8/k3K3 w - - 0 1").unwrap();
        let promotions = position
            .legal_moves()
            .into_iter()
            .filter(|mv| mv.from == sq("e7"))
            .count();
        assert_eq!(promotions, 4);
    }

    #[test]
    fn test_status() {
        let mate = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        assert_eq!(mate.status(), GameStatus::Won);
        let stalemate = Position::from_fen("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(stalemate.status(), GameStatus::Drawn);
        assert_eq!(Position::default().status(), GameStatus::Ongoing);
    }

    #[test]
    fn test_drop_passes_turn() {
        let mut position = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 3 7").unwrap();
        position.drop_unchecked(Piece::Rook, sq("a5"));
        assert_eq!(position.to_string(), "4k3/8/8/r7/8/8/8/4K3 w - - 0 8");
    }

    proptest! {
        #[test]
        fn legal_moves_agree_with_cozy_chess(choices in proptest::collection::vec(0usize..256, 0..40)) {
            let mut position = Position::default();
            let mut board = Board::default();
            for choice in choices {
                let ours = position.legal_moves();
                prop_assert_eq!(sorted(ours.clone()), sorted(cozy_moves(&board)));
                if ours.is_empty() {
                    break;
                }
                let names = sorted(ours);
                let next = mv(&names[choice % names.len()]);
                position.play_unchecked(next);
                board.play(next);
                prop_assert_eq!(position.side_to_move(), board.side_to_move());
                prop_assert_eq!(position.occupied(), board.occupied());
            }
        }
    }
}
