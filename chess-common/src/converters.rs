//! Conversions between cozy-chess types and their textual forms.

use cozy_chess::{Color, File, Piece, Rank, Square};

/// Parse a file letter (`a`..=`h`).
pub fn parse_file(c: char) -> Option<File> {
    match c {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

/// Parse a rank digit (`1`..=`8`).
pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

/// Parse a square name such as `e4`. Anything other than exactly two
/// characters is rejected.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

pub fn file_to_char(file: File) -> char {
    (b'a' + file as u8) as char
}

pub fn rank_to_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

/// Format a square as its lowercase name, e.g. `e4`.
pub fn format_square(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(file_to_char(sq.file()));
    s.push(rank_to_char(sq.rank()));
    s
}

/// Parse a piece letter in either case, as used by FEN and UCI.
pub fn parse_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'p' => Some(Piece::Pawn),
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        'k' => Some(Piece::King),
        _ => None,
    }
}

/// Lowercase piece letter, as used in UCI promotion suffixes.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// FEN letter for a colored piece: uppercase for white, lowercase for black.
pub fn fen_piece_char(piece: Piece, color: Color) -> char {
    let c = format_piece(piece);
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

/// Resolve a SAN role letter to a piece kind.
///
/// Only the uppercase letters SAN uses for pieces are recognised (`P`, `N`,
/// `B`, `R`, `Q`, `K`). Lowercase letters name files in SAN, so `b` is not a
/// bishop here.
pub fn role_from_san(code: &str) -> Option<Piece> {
    match code {
        "P" => Some(Piece::Pawn),
        "N" => Some(Piece::Knight),
        "B" => Some(Piece::Bishop),
        "R" => Some(Piece::Rook),
        "Q" => Some(Piece::Queen),
        "K" => Some(Piece::King),
        _ => None,
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}
