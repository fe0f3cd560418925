//! Terminal front end: owns the session and the keyboard move controller,
//! routes key presses and draws the board.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cozy_chess::Color;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use keyboard_move::{BoardSession, KeyboardMove};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color as UiColor, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::parser::InputLine;
use crate::session::LocalSession;
use crate::timer::ChessTimer;
use crate::ui::widgets::{BoardWidget, KeyboardMoveWidget};

pub struct App {
    session: Rc<RefCell<LocalSession>>,
    ctrl: KeyboardMove<LocalSession>,
    input: InputLine,
    /// Set by the controller's redraw hook and by anything else that changes
    /// what is on screen.
    dirty: Rc<Cell<bool>>,
    parser_ready: bool,
    flipped: bool,
    should_quit: bool,
}

impl App {
    pub fn new(session: LocalSession) -> Self {
        let step = session.step();
        let session = Rc::new(RefCell::new(session));
        let dirty = Rc::new(Cell::new(true));

        let redraw = {
            let dirty = Rc::clone(&dirty);
            move || dirty.set(true)
        };
        let ctrl = KeyboardMove::new(Rc::clone(&session), session.clone(), step, redraw);

        Self {
            session,
            ctrl,
            input: InputLine::new(),
            dirty,
            parser_ready: false,
            flipped: false,
            should_quit: false,
        }
    }

    pub fn ctrl(&self) -> &KeyboardMove<LocalSession> {
        &self.ctrl
    }

    pub fn input(&self) -> &InputLine {
        &self.input
    }

    pub fn session(&self) -> &Rc<RefCell<LocalSession>> {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether a frame needs drawing; resets the flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Push the session's position to the controller when it changed, and
    /// notice a freshly attached parser.
    pub fn sync(&mut self) {
        let changed = self.session.borrow_mut().take_changed();
        if changed {
            let step = self.session.borrow().step();
            self.ctrl.update(step);
            self.dirty.set(true);
        }

        let ready = self.ctrl.has_handler();
        if ready != self.parser_ready {
            self.parser_ready = ready;
            self.dirty.set(true);
        }
    }

    /// Periodic work: run the clock.
    pub fn tick(&mut self) {
        let running = {
            let mut session = self.session.borrow_mut();
            session.tick_clock();
            session
                .clock_handle()
                .is_some_and(|clock| clock.borrow().active_side().is_some())
        };
        if running {
            self.dirty.set(true);
        }
        self.sync();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.ctrl.has_focus() {
            self.handle_focused_key(key);
        } else {
            self.handle_board_key(key);
        }
        self.dirty.set(true);
        self.sync();
    }

    fn handle_focused_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if !self.input.submit() {
                    self.input
                        .set_feedback(Some("Move input is still loading".to_string()));
                }
            }
            KeyCode::Esc => {
                if self.session.borrow().staged_move().is_some() {
                    self.session.borrow_mut().submit_move(false);
                } else {
                    self.input.clear();
                    self.ctrl.set_focus(false);
                }
            }
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Left if self.input.is_empty() => self.ctrl.jump(-1),
            KeyCode::Right if self.input.is_empty() => self.ctrl.jump(1),
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Enter => self.ctrl.set_focus(true),
            KeyCode::Char('y') => self.ctrl.confirm_move(),
            KeyCode::Esc => self.session.borrow_mut().submit_move(false),
            KeyCode::Char('f') => self.flipped = !self.flipped,
            KeyCode::Left => self.ctrl.jump(-1),
            KeyCode::Right => self.ctrl.jump(1),
            KeyCode::Home => self.ctrl.jump(i32::MIN),
            KeyCode::End => self.ctrl.jump(i32::MAX),
            _ => {}
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let session = self.session.borrow();
        let (board_w, board_h) = BoardWidget::min_dimensions();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(board_h),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.area());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(board_w), Constraint::Min(20)])
            .split(rows[0]);

        let placement = session.view();
        let title = format!(
            "Ply {}/{}",
            session.ply(),
            session.game().ply()
        );
        frame.render_widget(
            BoardWidget {
                placement: &placement,
                selected: session.selected(),
                dests: session.selected_dests(),
                last_move: session.last_move(),
                pockets: session.pockets(),
                flipped: self.flipped,
                title: &title,
            },
            columns[0],
        );

        render_info(frame, columns[1], &session);

        let text = self.input.text();
        let feedback = self.input.feedback();
        frame.render_widget(
            KeyboardMoveWidget {
                text: &text,
                focused: self.ctrl.has_focus(),
                feedback: feedback.as_deref(),
                ready: self.parser_ready,
            },
            rows[1],
        );

        let controls = if self.ctrl.has_focus() {
            "Enter: play  Esc: leave input  \u{2190}/\u{2192}: browse"
        } else {
            "Enter: type a move  \u{2190}/\u{2192}: browse  f: flip  y: confirm  q: quit"
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                controls,
                Style::default().fg(UiColor::DarkGray),
            ))),
            rows[2],
        );
    }
}

fn render_info(frame: &mut Frame, area: Rect, session: &LocalSession) {
    let mut lines = Vec::new();

    let to_move = match session.game().side_to_move() {
        Color::White => "White to move",
        Color::Black => "Black to move",
    };
    lines.push(Line::from(Span::styled(
        to_move,
        Style::default().add_modifier(Modifier::BOLD),
    )));

    if let Some(clock) = session.clock_handle() {
        let clock = clock.borrow();
        for (side, name) in [(Color::White, "White"), (Color::Black, "Black")] {
            let style = if clock.active_side() == Some(side) {
                Style::default().fg(UiColor::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{name}: {}", ChessTimer::format_time(clock.remaining(side))),
                style,
            )));
        }
    }

    lines.push(Line::from(""));
    let moves: Vec<&str> = session
        .game()
        .history()
        .iter()
        .map(|entry| entry.uci.as_str())
        .collect();
    for (i, pair) in moves.chunks(2).enumerate() {
        lines.push(Line::from(format!("{:>3}. {}", i + 1, pair.join("  "))));
    }

    if let Some(status) = session.status() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(UiColor::Cyan),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(UiColor::DarkGray))
        .title("Game");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
