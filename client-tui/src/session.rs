//! Local hotseat game session.
//!
//! Owns the [`Game`], the selection and the staged move, and implements the
//! collaborator traits the keyboard move controller drives. The player color
//! is always the side to move.

use std::cell::RefCell;
use std::rc::Rc;

use chess::fen::STARTING_FEN;
use chess::{format_square, Game, GameError, Placement, Pockets};
use cozy_chess::{BitBoard, Color, GameStatus, Move, Piece, Square};
use keyboard_move::{BoardSession, Promotion, Step};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::timer::ChessTimer;

/// Shared clock handle exposed to the parser.
pub type ClockHandle = Rc<RefCell<ChessTimer>>;

pub struct LocalSession {
    game: Game,
    viewed_ply: u32,
    selected: Option<Square>,
    /// Completed gesture waiting for confirmation.
    staged: Option<Move>,
    /// Pawn move to the last rank waiting for its piece.
    pending_promotion: Option<(Square, Square)>,
    /// Drop preview shown before the drop is submitted.
    ghost: Option<(Piece, Color, Square)>,
    confirm_moves: bool,
    clock: Option<ClockHandle>,
    status: Option<String>,
    /// Side whose flag fell.
    timed_out: Option<Color>,
    changed: bool,
}

impl LocalSession {
    pub fn new(game: Game) -> Self {
        Self {
            viewed_ply: game.ply(),
            game,
            selected: None,
            staged: None,
            pending_promotion: None,
            ghost: None,
            confirm_moves: false,
            clock: None,
            status: None,
            timed_out: None,
            changed: false,
        }
    }

    /// Set up a session from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, GameError> {
        let fen = config.fen.as_deref().unwrap_or(STARTING_FEN);
        let game = if config.crazyhouse {
            Game::from_crazyhouse_fen(fen)?
        } else {
            Game::from_fen(fen)?
        };

        let mut session = Self::new(game).with_confirm_moves(config.confirm_moves);
        if let Some(initial) = config.clock {
            session = session.with_clock(ChessTimer::new(initial).with_increment(config.increment));
        }
        Ok(session)
    }

    /// Stage completed moves until they are confirmed.
    pub fn with_confirm_moves(mut self, confirm: bool) -> Self {
        self.confirm_moves = confirm;
        self
    }

    pub fn with_clock(mut self, timer: ChessTimer) -> Self {
        self.clock = Some(Rc::new(RefCell::new(timer)));
        self
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Whether the board accepts moves: showing the last ply, nothing staged
    /// and the game still running.
    pub fn is_interactive(&self) -> bool {
        self.viewed_ply == self.game.ply()
            && self.staged.is_none()
            && self.timed_out.is_none()
            && self.game.status() == GameStatus::Ongoing
    }

    /// Snapshot of the viewed position for the parser.
    pub fn step(&self) -> Step {
        let fen = self
            .game
            .fen_at(self.viewed_ply)
            .map(str::to_string)
            .unwrap_or_else(|| self.game.to_fen());
        let dests = self.is_interactive().then(|| self.game.dests());
        Step::new(self.viewed_ply, fen, dests)
    }

    /// Report and reset whether anything shown changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Pieces of the viewed position, including a pending drop preview.
    pub fn view(&self) -> Placement {
        let fen = self
            .game
            .fen_at(self.viewed_ply)
            .map(str::to_string)
            .unwrap_or_else(|| self.game.to_fen());
        let mut placement = Placement::from_fen(&fen).unwrap_or_else(|_| Placement::empty());
        if let Some((piece, color, square)) = self.ghost {
            placement.set(square, Some((piece, color)));
        }
        placement
    }

    /// Destinations of the selected piece.
    pub fn selected_dests(&self) -> BitBoard {
        self.selected
            .filter(|_| self.is_interactive())
            .and_then(|from| self.game.dests().get(&from).copied())
            .unwrap_or(BitBoard::EMPTY)
    }

    /// Origin and destination of the ply that led to the viewed position.
    pub fn last_move(&self) -> Option<(Option<Square>, Square)> {
        let entry = self
            .game
            .history()
            .get((self.viewed_ply as usize).checked_sub(1)?)?;
        let from = match entry.action {
            chess::PlyAction::Move(mv) => Some(mv.from),
            chess::PlyAction::Drop { .. } => None,
        };
        Some((from, entry.action.to()))
    }

    pub fn staged_move(&self) -> Option<Move> {
        self.staged
    }

    pub fn pending_promotion(&self) -> Option<(Square, Square)> {
        self.pending_promotion
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
        self.changed = true;
    }

    pub fn clock_handle(&self) -> Option<&ClockHandle> {
        self.clock.as_ref()
    }

    /// Advance the clock and end the game when the running side's flag falls.
    pub fn tick_clock(&mut self) {
        let Some(clock) = &self.clock else {
            return;
        };
        let fallen = {
            let mut clock = clock.borrow_mut();
            clock.tick();
            let fallen = clock.active_side().filter(|&side| clock.is_flag_fallen(side));
            if fallen.is_some() {
                clock.pause();
            }
            fallen
        };
        if let Some(side) = fallen {
            self.time_out(side);
        }
    }

    /// `side` ran out of time.
    pub fn time_out(&mut self, side: Color) {
        info!(side = chess::color_name(side), "flag fell");
        self.timed_out = Some(side);
        self.selected = None;
        self.status = Some(match side {
            Color::White => "White's time has expired!".to_string(),
            Color::Black => "Black's time has expired!".to_string(),
        });
        self.changed = true;
    }

    fn play_or_stage(&mut self, mv: Move) {
        if self.confirm_moves {
            debug!(uci = %chess::format_uci_move(mv), "move staged for confirmation");
            self.staged = Some(mv);
            self.status = Some("Confirm move? (y / Esc)".to_string());
            self.changed = true;
        } else {
            self.commit(mv);
        }
    }

    fn commit(&mut self, mv: Move) {
        let mover = self.game.side_to_move();
        let played = self.game.make_move(mv).map(|entry| entry.uci.clone());
        self.after_ply(mover, played);
    }

    fn after_ply(&mut self, mover: Color, played: Result<String, GameError>) {
        match played {
            Ok(uci) => {
                info!(%uci, ply = self.game.ply(), "ply played");
                self.viewed_ply = self.game.ply();
                self.status = match self.game.status() {
                    GameStatus::Ongoing => None,
                    GameStatus::Won => Some(match mover {
                        Color::White => "White wins".to_string(),
                        Color::Black => "Black wins".to_string(),
                    }),
                    GameStatus::Drawn => Some("Draw".to_string()),
                };
                if let Some(clock) = &self.clock {
                    let mut clock = clock.borrow_mut();
                    if self.game.status() == GameStatus::Ongoing {
                        clock.press(mover);
                    } else {
                        clock.pause();
                    }
                }
            }
            Err(e) => {
                warn!("Move rejected: {}", e);
                self.status = Some(e.to_string());
            }
        }
        self.changed = true;
    }

    fn own_piece(&self, square: Square) -> bool {
        self.game.position().color_on(square) == Some(self.game.side_to_move())
    }
}

impl BoardSession for LocalSession {
    type Clock = ClockHandle;

    fn selected(&self) -> Option<Square> {
        self.selected
    }

    fn cancel_move(&mut self) {
        if self.selected.is_some() || self.pending_promotion.is_some() || self.ghost.is_some() {
            self.changed = true;
        }
        self.selected = None;
        self.pending_promotion = None;
        self.ghost = None;
    }

    fn select_square(&mut self, square: Square, force: bool) {
        if !self.is_interactive() {
            debug!(square = %format_square(square), "selection ignored: board not interactive");
            return;
        }
        self.changed = true;

        if let Some(from) = self.selected.filter(|&from| force && from != square) {
            if self.game.needs_promotion(from, square) {
                self.selected = None;
                self.pending_promotion = Some((from, square));
                self.status = Some("Promote to? (=Q, =R, =B, =N)".to_string());
                return;
            }
            if let Some(mv) = self.game.find_move(from, square, None) {
                self.selected = None;
                self.play_or_stage(mv);
                return;
            }
        }

        self.selected = self.own_piece(square).then_some(square);
    }

    fn piece_on(&self, square: Square) -> Option<(Piece, Color)> {
        self.view().piece_at(square)
    }

    fn new_piece(&mut self, piece: Piece, color: Color, square: Square) {
        self.ghost = Some((piece, color, square));
        self.changed = true;
    }

    fn send_new_piece(&mut self, piece: Piece, square: Square, premove: bool) {
        self.ghost = None;
        if premove {
            debug!("premoved drops are not supported in a local game");
            self.changed = true;
            return;
        }
        let mover = self.game.side_to_move();
        let played = self
            .game
            .drop_piece(piece, square)
            .map(|entry| entry.uci.clone());
        self.after_ply(mover, played);
    }

    fn submit_move(&mut self, confirm: bool) {
        let Some(mv) = self.staged.take() else {
            return;
        };
        if confirm {
            self.commit(mv);
        } else {
            debug!("staged move cancelled");
            self.status = None;
            self.changed = true;
        }
    }

    fn ply(&self) -> u32 {
        self.viewed_ply
    }

    fn user_jump(&mut self, ply: u32) {
        let ply = ply.min(self.game.ply());
        if ply != self.viewed_ply {
            self.viewed_ply = ply;
            self.selected = None;
            self.pending_promotion = None;
            self.changed = true;
        }
    }

    fn player_color(&self) -> Color {
        self.game.side_to_move()
    }

    fn pockets(&self) -> Option<&Pockets> {
        self.game.pockets()
    }

    fn drop_valid(&self, piece: Piece, square: Square) -> bool {
        if !self.is_interactive() {
            return false;
        }
        match self.game.check_drop(self.game.side_to_move(), piece, square) {
            Ok(_) => true,
            Err(e) => {
                debug!("drop rejected: {}", e);
                false
            }
        }
    }

    fn clock(&self) -> Option<ClockHandle> {
        self.clock.clone()
    }
}

impl Promotion for LocalSession {
    fn send_promotion(&mut self, orig: Square, dest: Square, piece: Piece, premove: bool) {
        self.pending_promotion = None;
        if premove || !self.is_interactive() {
            debug!("promotion ignored: board not interactive");
            return;
        }
        match self.game.find_move(orig, dest, Some(piece)) {
            Some(mv) => self.play_or_stage(mv),
            None => debug!(
                from = %format_square(orig),
                to = %format_square(dest),
                "promotion ignored: no such move"
            ),
        }
    }
}
