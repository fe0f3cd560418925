//! Text parser for the keyboard move input.
//!
//! Understands square names (`e2`, selects or completes a move), coordinate
//! moves (`e2e4`, `e7e8q`), SAN (`Nf3`, `exd5`, `e8=Q`, `O-O`), drops
//! (`N@f3`) and a few commands: `<`/`>` and `<<`/`>>` to browse plies, `y` to
//! confirm a staged move, `clock` to read the clocks and `/` to leave the
//! input.

use std::cell::RefCell;
use std::rc::Rc;

use chess::{parse_square, Dests, Position as ChessPosition};
use cozy_chess::{Color, File, Piece, Rank, Square};
use keyboard_move::ParserOpts;
use tracing::debug;

use crate::session::LocalSession;
use crate::timer::ChessTimer;

type Listener = Rc<dyn Fn(&str)>;

/// Single-line text input the parser reads from.
///
/// Cheap to clone; clones share the same line.
#[derive(Clone, Default)]
pub struct InputLine {
    inner: Rc<InputInner>,
}

#[derive(Default)]
struct InputInner {
    text: RefCell<String>,
    feedback: RefCell<Option<String>>,
    on_submit: RefCell<Option<Listener>>,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.text.borrow().is_empty()
    }

    pub fn push(&self, c: char) {
        self.inner.text.borrow_mut().push(c);
        self.set_feedback(None);
    }

    pub fn backspace(&self) {
        self.inner.text.borrow_mut().pop();
        self.set_feedback(None);
    }

    pub fn clear(&self) {
        self.inner.text.borrow_mut().clear();
    }

    /// Message about the last submitted line, if it was rejected or asked for
    /// information.
    pub fn feedback(&self) -> Option<String> {
        self.inner.feedback.borrow().clone()
    }

    pub fn set_feedback(&self, feedback: Option<String>) {
        *self.inner.feedback.borrow_mut() = feedback;
    }

    /// Install the listener called with each submitted line.
    pub fn on_submit(&self, listener: impl Fn(&str) + 'static) {
        *self.inner.on_submit.borrow_mut() = Some(Rc::new(listener));
    }

    /// Hand the typed line to the listener and clear it. Returns false when
    /// no listener is installed yet; the text is kept in that case.
    pub fn submit(&self) -> bool {
        let listener = self.inner.on_submit.borrow().clone();
        let Some(listener) = listener else {
            return false;
        };
        let text = std::mem::take(&mut *self.inner.text.borrow_mut());
        listener(&text);
        true
    }
}

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(Square),
    Move { from: Square, to: Square },
    Promote { from: Square, to: Square, piece: String },
    Drop { piece: String, to: Square },
    Jump(i32),
    Confirm,
    Clock,
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Nothing to play")]
    Empty,
    #[error("Not a move: {0}")]
    Unknown(String),
    #[error("No legal move matches {0}")]
    NoSuchMove(String),
    #[error("{0} is ambiguous")]
    Ambiguous(String),
    #[error("Add a promotion piece, e.g. =Q")]
    PromotionRequired,
    #[error("Moves can only be played on the latest position")]
    NotPlayable,
}

/// The position the parser resolves input against.
#[derive(Debug, Clone, Default)]
pub struct Position {
    board: Option<ChessPosition>,
    dests: Option<Dests>,
}

impl Position {
    pub fn new(fen: &str, dests: Option<Dests>) -> Self {
        Self {
            board: chess::fen::parse_fen(fen).ok(),
            dests,
        }
    }

    fn can_move(&self, from: Square, to: Square) -> bool {
        self.dests
            .as_ref()
            .and_then(|dests| dests.get(&from))
            .is_some_and(|targets| targets.has(to))
    }

    fn own_piece(&self, square: Square) -> bool {
        self.board
            .as_ref()
            .is_some_and(|board| board.color_on(square) == Some(board.side_to_move()))
    }

    fn is_promotion(&self, from: Square, to: Square) -> bool {
        let Some(board) = &self.board else {
            return false;
        };
        board.piece_on(from) == Some(Piece::Pawn)
            && matches!(to.rank(), Rank::First | Rank::Eighth)
    }
}

/// Parse one submitted line. `selected` is the square currently selected on
/// the board.
pub fn parse_command(
    text: &str,
    position: &Position,
    selected: Option<Square>,
) -> Result<Command, ParseError> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    match text.as_str() {
        "" => return Err(ParseError::Empty),
        "<" => return Ok(Command::Jump(-1)),
        ">" => return Ok(Command::Jump(1)),
        "<<" => return Ok(Command::Jump(i32::MIN)),
        ">>" => return Ok(Command::Jump(i32::MAX)),
        "y" | "yes" => return Ok(Command::Confirm),
        "clock" => return Ok(Command::Clock),
        "/" => return Ok(Command::Blur),
        _ => {}
    }

    if let Some((piece, square)) = text.split_once('@') {
        let to = parse_square(square).ok_or_else(|| ParseError::Unknown(text.clone()))?;
        return Ok(Command::Drop {
            piece: piece.to_string(),
            to,
        });
    }

    if let Some(square) = parse_square(&text) {
        let completes = selected.is_some_and(|from| position.can_move(from, square));
        if completes || position.own_piece(square) {
            if position.dests.is_none() {
                return Err(ParseError::NotPlayable);
            }
            return Ok(Command::Select(square));
        }
    }

    if let Some(command) = parse_coordinates(&text, position)? {
        return Ok(command);
    }

    parse_san(&text, position)
}

/// `e2e4`, `e7e8q` and `e7e8=Q`.
fn parse_coordinates(text: &str, position: &Position) -> Result<Option<Command>, ParseError> {
    let (Some(from), Some(to)) = (
        text.get(..2).and_then(parse_square),
        text.get(2..4).and_then(parse_square),
    ) else {
        return Ok(None);
    };
    let piece = match text.get(4..) {
        Some("") => None,
        Some(rest) => match rest.strip_prefix('=') {
            Some(piece) => Some(piece.to_string()),
            None => Some(rest.to_ascii_uppercase()),
        },
        None => return Ok(None),
    };

    if position.dests.is_none() {
        return Err(ParseError::NotPlayable);
    }
    if !position.can_move(from, to) {
        return Err(ParseError::NoSuchMove(text.to_string()));
    }
    to_command(from, to, piece, position)
}

fn to_command(
    from: Square,
    to: Square,
    piece: Option<String>,
    position: &Position,
) -> Result<Option<Command>, ParseError> {
    match (position.is_promotion(from, to), piece) {
        (true, Some(piece)) => Ok(Some(Command::Promote { from, to, piece })),
        (true, None) => Err(ParseError::PromotionRequired),
        (false, _) => Ok(Some(Command::Move { from, to })),
    }
}

/// Standard algebraic notation, resolved against the legal moves.
fn parse_san(text: &str, position: &Position) -> Result<Command, ParseError> {
    let unknown = || ParseError::Unknown(text.to_string());
    let san = text.trim_end_matches(['+', '#', '!', '?']);

    let (Some(board), Some(_)) = (&position.board, &position.dests) else {
        return Err(ParseError::NotPlayable);
    };

    if let Some(target_file) = match san {
        "O-O" | "0-0" => Some(File::G),
        "O-O-O" | "0-0-0" => Some(File::C),
        _ => None,
    } {
        let king = board.king(board.side_to_move()).ok_or_else(unknown)?;
        let to = Square::new(target_file, king.rank());
        if !position.can_move(king, to) {
            return Err(ParseError::NoSuchMove(text.to_string()));
        }
        return Ok(Command::Move { from: king, to });
    }

    let (body, promotion) = match san.split_once('=') {
        Some((body, piece)) => (body, Some(piece.to_string())),
        None => (san, None),
    };

    let mut chars = body.chars();
    let piece = match body.chars().next() {
        Some('N') => Piece::Knight,
        Some('B') => Piece::Bishop,
        Some('R') => Piece::Rook,
        Some('Q') => Piece::Queen,
        Some('K') => Piece::King,
        Some('a'..='h') => Piece::Pawn,
        _ => return Err(unknown()),
    };
    if piece != Piece::Pawn {
        chars.next();
    }
    let rest: String = chars.filter(|&c| c != 'x').collect();
    let split = rest
        .char_indices()
        .rev()
        .nth(1)
        .map(|(i, _)| i)
        .ok_or_else(unknown)?;
    let (hint, dest) = rest.split_at(split);
    let to = parse_square(dest).ok_or_else(unknown)?;

    let mut candidates: Vec<Square> = board
        .legal_moves()
        .into_iter()
        .filter(|mv| mv.to == to && board.piece_on(mv.from) == Some(piece))
        .filter(|mv| matches_hint(mv.from, hint))
        .map(|mv| mv.from)
        .collect();
    candidates.dedup();

    match candidates.as_slice() {
        [] => Err(ParseError::NoSuchMove(text.to_string())),
        [from] => to_command(*from, to, promotion, position)?.ok_or_else(unknown),
        _ => Err(ParseError::Ambiguous(text.to_string())),
    }
}

/// SAN disambiguation: an origin file, rank or both.
fn matches_hint(from: Square, hint: &str) -> bool {
    hint.chars().all(|c| match c {
        'a'..='h' => chess::file_to_char(from.file()) == c,
        '1'..='8' => chess::rank_to_char(from.rank()) == c,
        _ => false,
    })
}

/// Build the parser from the controller's options and return the callback
/// that receives positions.
pub fn coordinate_parser(
    opts: ParserOpts<LocalSession, InputLine>,
) -> impl Fn(&str, Option<&Dests>) + 'static {
    let position = Rc::new(RefCell::new(Position::default()));
    let input = opts.input.clone();

    let latest = Rc::clone(&position);
    input.on_submit(move |text| {
        let selected = opts.has_selected();
        let parsed = parse_command(text, &latest.borrow(), selected);
        match parsed {
            Ok(command) => {
                debug!(?command, "keyboard command");
                opts.input.set_feedback(None);
                execute(&opts, command);
            }
            Err(ParseError::Empty) => {}
            Err(e) => {
                debug!(text, "input rejected: {}", e);
                opts.input.set_feedback(Some(e.to_string()));
            }
        }
    });

    move |fen, dests| {
        *position.borrow_mut() = Position::new(fen, dests.cloned());
    }
}

fn execute(opts: &ParserOpts<LocalSession, InputLine>, command: Command) {
    match command {
        Command::Select(square) => opts.select(square),
        Command::Move { from, to } => opts.san(from, to),
        Command::Promote { from, to, piece } => opts.promote(from, to, &piece),
        Command::Drop { piece, to } => opts.drop(to, &piece),
        Command::Jump(delta) => opts.jump(delta),
        Command::Confirm => opts.confirm_move(),
        Command::Clock => {
            let text = match opts.clock() {
                Some(clock) => {
                    let clock = clock.borrow();
                    format!(
                        "White {} / Black {}",
                        ChessTimer::format_time(clock.remaining(Color::White)),
                        ChessTimer::format_time(clock.remaining(Color::Black))
                    )
                }
                None => "No clock in this game".to_string(),
            };
            opts.input.set_feedback(Some(text));
        }
        Command::Blur => opts.set_focus(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Game;

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    fn position(fen: &str) -> Position {
        let game = Game::from_fen(fen).unwrap();
        Position::new(fen, Some(game.dests()))
    }

    fn start() -> Position {
        position(chess::fen::STARTING_FEN)
    }

    #[test]
    fn test_commands() {
        let pos = start();
        assert_eq!(parse_command("<", &pos, None), Ok(Command::Jump(-1)));
        assert_eq!(parse_command(">>", &pos, None), Ok(Command::Jump(i32::MAX)));
        assert_eq!(parse_command(" y ", &pos, None), Ok(Command::Confirm));
        assert_eq!(parse_command("clock", &pos, None), Ok(Command::Clock));
        assert_eq!(parse_command("/", &pos, None), Ok(Command::Blur));
        assert_eq!(parse_command("", &pos, None), Err(ParseError::Empty));
    }

    #[test]
    fn test_square_selects_own_piece() {
        let pos = start();
        assert_eq!(parse_command("e2", &pos, None), Ok(Command::Select(sq("e2"))));
        // e4 is a destination of the selected pawn.
        assert_eq!(
            parse_command("e4", &pos, Some(sq("e2"))),
            Ok(Command::Select(sq("e4")))
        );
    }

    #[test]
    fn test_bare_square_falls_back_to_pawn_san() {
        let pos = start();
        assert_eq!(
            parse_command("e4", &pos, None),
            Ok(Command::Move {
                from: sq("e2"),
                to: sq("e4")
            })
        );
    }

    #[test]
    fn test_coordinate_moves() {
        let pos = start();
        assert_eq!(
            parse_command("g1f3", &pos, None),
            Ok(Command::Move {
                from: sq("g1"),
                to: sq("f3")
            })
        );
        assert_eq!(
            parse_command("g1g3", &pos, None),
            Err(ParseError::NoSuchMove("g1g3".to_string()))
        );
    }

    #[test]
    fn test_san_moves() {
        let pos = start();
        assert_eq!(
            parse_command("Nc3", &pos, None),
            Ok(Command::Move {
                from: sq("b1"),
                to: sq("c3")
            })
        );
        assert!(matches!(
            parse_command("Qh5", &pos, None),
            Err(ParseError::NoSuchMove(_))
        ));
        assert!(matches!(
            parse_command("hello", &pos, None),
            Err(ParseError::Unknown(_))
        ));
    }

    #[test]
    fn test_san_disambiguation() {
        // Knights on b1 and f1 can both reach d2.
        let pos = position("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert_eq!(
            parse_command("Nd2", &pos, None),
            Err(ParseError::Ambiguous("Nd2".to_string()))
        );
        assert_eq!(
            parse_command("Nbd2", &pos, None),
            Ok(Command::Move {
                from: sq("b1"),
                to: sq("d2")
            })
        );
    }

    #[test]
    fn test_castling() {
        let pos = position("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(
            parse_command("O-O", &pos, None),
            Ok(Command::Move {
                from: sq("e1"),
                to: sq("g1")
            })
        );
        assert_eq!(
            parse_command("O-O-O", &pos, None),
            Ok(Command::Move {
                from: sq("e1"),
                to: sq("c1")
            })
        );
    }

    #[test]
    fn test_promotions() {
        let pos = position("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        let promote = Ok(Command::Promote {
            from: sq("e7"),
            to: sq("e8"),
            piece: "Q".to_string(),
        });
        assert_eq!(parse_command("e8=Q", &pos, None), promote);
        assert_eq!(parse_command("e7e8q", &pos, None), promote);
        assert_eq!(parse_command("e7e8=Q", &pos, None), promote);
        assert_eq!(
            parse_command("e8", &pos, None),
            Err(ParseError::PromotionRequired)
        );
    }

    #[test]
    fn test_drops_pass_the_piece_code_through() {
        let pos = start();
        assert_eq!(
            parse_command("Q@e4", &pos, None),
            Ok(Command::Drop {
                piece: "Q".to_string(),
                to: sq("e4")
            })
        );
        assert_eq!(
            parse_command("q@e4", &pos, None),
            Ok(Command::Drop {
                piece: "q".to_string(),
                to: sq("e4")
            })
        );
        assert!(matches!(
            parse_command("Q@z9", &pos, None),
            Err(ParseError::Unknown(_))
        ));
    }

    #[test]
    fn test_moves_need_a_playable_position() {
        let pos = Position::new(chess::fen::STARTING_FEN, None);
        assert_eq!(parse_command("e2", &pos, None), Err(ParseError::NotPlayable));
        assert_eq!(parse_command("e2e4", &pos, None), Err(ParseError::NotPlayable));
        assert_eq!(parse_command("Nc3", &pos, None), Err(ParseError::NotPlayable));
        // Browsing still works.
        assert_eq!(parse_command("<", &pos, None), Ok(Command::Jump(-1)));
    }

    #[test]
    fn test_non_ascii_input_is_rejected() {
        let pos = start();
        for text in ["Né4", "é4", "Ñ", "e2é4", "Q@é4", "♞f3"] {
            assert!(
                matches!(
                    parse_command(text, &pos, None),
                    Err(ParseError::Unknown(_) | ParseError::NoSuchMove(_))
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_resolves_moves_with_extra_material() {
        let pos = position("4k3/8/8/8/4P3/8/PPPPPPPP/4K3 b - - 0 1");
        assert_eq!(
            parse_command("Kd7", &pos, None),
            Ok(Command::Move {
                from: sq("e8"),
                to: sq("d7"),
            })
        );
    }

    #[test]
    fn test_input_line_submit() {
        let input = InputLine::new();
        input.push('e');
        input.push('4');
        assert!(!input.submit());
        assert_eq!(input.text(), "e4");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        input.on_submit(move |text| sink.borrow_mut().push(text.to_string()));
        assert!(input.submit());
        assert!(input.is_empty());
        assert_eq!(*seen.borrow(), vec!["e4"]);
    }
}
