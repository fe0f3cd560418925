use chess::{Placement, Pockets};
use cozy_chess::{BitBoard, Color as ChessColor, File, Piece, Rank, Square};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Widget},
};

const SQUARE_WIDTH: u16 = 5;
const SQUARE_HEIGHT: u16 = 3;

/// Maps a chess piece + color to a Unicode symbol.
pub fn piece_to_unicode(piece: Piece, color: ChessColor) -> &'static str {
    match (piece, color) {
        (Piece::King, ChessColor::White) => "\u{2654}",
        (Piece::Queen, ChessColor::White) => "\u{2655}",
        (Piece::Rook, ChessColor::White) => "\u{2656}",
        (Piece::Bishop, ChessColor::White) => "\u{2657}",
        (Piece::Knight, ChessColor::White) => "\u{2658}",
        (Piece::Pawn, ChessColor::White) => "\u{2659}",
        (Piece::King, ChessColor::Black) => "\u{265a}",
        (Piece::Queen, ChessColor::Black) => "\u{265b}",
        (Piece::Rook, ChessColor::Black) => "\u{265c}",
        (Piece::Bishop, ChessColor::Black) => "\u{265d}",
        (Piece::Knight, ChessColor::Black) => "\u{265e}",
        (Piece::Pawn, ChessColor::Black) => "\u{265f}",
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SquareHighlight {
    Selected,
    LegalMove,
    LastMove,
    None,
}

impl SquareHighlight {
    fn bg_color(self, is_light_square: bool) -> Color {
        let (light, dark) = match self {
            Self::Selected => (Color::LightYellow, Color::Yellow),
            Self::LegalMove => (Color::LightBlue, Color::Blue),
            Self::LastMove => (Color::LightGreen, Color::Green),
            Self::None => (Color::Rgb(240, 217, 181), Color::Rgb(181, 136, 99)),
        };
        if is_light_square {
            light
        } else {
            dark
        }
    }
}

/// Board with selection, destination and last-move highlights, and the
/// crazyhouse pockets above and below it.
pub struct BoardWidget<'a> {
    pub placement: &'a Placement,
    pub selected: Option<Square>,
    pub dests: BitBoard,
    pub last_move: Option<(Option<Square>, Square)>,
    pub pockets: Option<&'a Pockets>,
    pub flipped: bool,
    pub title: &'a str,
}

impl BoardWidget<'_> {
    /// Space the board needs, borders included.
    pub fn min_dimensions() -> (u16, u16) {
        (SQUARE_WIDTH * 8 + 5, SQUARE_HEIGHT * 8 + 5)
    }

    fn highlight(&self, square: Square) -> SquareHighlight {
        if self.selected == Some(square) {
            SquareHighlight::Selected
        } else if self.dests.has(square) {
            SquareHighlight::LegalMove
        } else if self
            .last_move
            .is_some_and(|(from, to)| from == Some(square) || to == square)
        {
            SquareHighlight::LastMove
        } else {
            SquareHighlight::None
        }
    }
}

impl Widget for BoardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        block.render(area, buf);

        let board_width = SQUARE_WIDTH * 8 + 2;
        let board_height = SQUARE_HEIGHT * 8 + 3;
        if inner.width < board_width || inner.height < board_height {
            buf.set_string(
                inner.x,
                inner.y,
                "Terminal too small",
                Style::default().fg(Color::Red),
            );
            return;
        }

        let offset_x = inner.width.saturating_sub(board_width) / 2;
        let offset_y = inner.height.saturating_sub(board_height) / 2;
        let start_x = inner.x + offset_x + 2;
        let start_y = inner.y + offset_y + 1;

        // Top pocket belongs to the side drawn at the top.
        let (top, bottom) = if self.flipped {
            (ChessColor::White, ChessColor::Black)
        } else {
            (ChessColor::Black, ChessColor::White)
        };
        if let Some(pockets) = self.pockets {
            render_pocket(buf, start_x, start_y - 1, pockets, top);
            render_pocket(buf, start_x, start_y + SQUARE_HEIGHT * 8 + 1, pockets, bottom);
        }

        for row in 0..8u16 {
            let rank_idx = if self.flipped { row } else { 7 - row };
            let y = start_y + row * SQUARE_HEIGHT;
            buf.set_string(
                start_x - 2,
                y + SQUARE_HEIGHT / 2,
                chess::rank_to_char(Rank::index(rank_idx as usize)).to_string(),
                Style::default().fg(Color::Yellow),
            );

            for col in 0..8u16 {
                let file_idx = if self.flipped { 7 - col } else { col };
                let square =
                    Square::new(File::index(file_idx as usize), Rank::index(rank_idx as usize));
                let x = start_x + col * SQUARE_WIDTH;

                let is_light_square = (file_idx + rank_idx) % 2 == 1;
                let bg_color = self.highlight(square).bg_color(is_light_square);
                render_square(buf, x, y, bg_color);

                if let Some((piece, color)) = self.placement.piece_at(square) {
                    let fg_color = match color {
                        ChessColor::White => Color::White,
                        ChessColor::Black => Color::Black,
                    };
                    buf.set_string(
                        x + SQUARE_WIDTH / 2,
                        y + SQUARE_HEIGHT / 2,
                        piece_to_unicode(piece, color),
                        Style::default()
                            .bg(bg_color)
                            .fg(fg_color)
                            .add_modifier(Modifier::BOLD),
                    );
                }
            }
        }

        let file_y = start_y + SQUARE_HEIGHT * 8;
        for col in 0..8u16 {
            let file_idx = if self.flipped { 7 - col } else { col };
            buf.set_string(
                start_x + col * SQUARE_WIDTH + SQUARE_WIDTH / 2,
                file_y,
                chess::file_to_char(File::index(file_idx as usize)).to_string(),
                Style::default().fg(Color::Yellow),
            );
        }
    }
}

fn render_square(buf: &mut Buffer, x: u16, y: u16, bg_color: Color) {
    let style = Style::default().bg(bg_color);
    for dy in 0..SQUARE_HEIGHT {
        for dx in 0..SQUARE_WIDTH {
            buf[(x + dx, y + dy)].set_style(style);
        }
    }
}

fn render_pocket(buf: &mut Buffer, x: u16, y: u16, pockets: &Pockets, color: ChessColor) {
    let text: Vec<String> = pockets
        .contents(color)
        .map(|(piece, count)| format!("{}x{}", piece_to_unicode(piece, color), count))
        .collect();
    let text = if text.is_empty() {
        "-".to_string()
    } else {
        text.join(" ")
    };
    buf.set_string(x, y, text, Style::default().fg(Color::Gray));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::parse_square;

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    fn render(widget: BoardWidget) -> Buffer {
        let (w, h) = BoardWidget::min_dimensions();
        let area = Rect::new(0, 0, w, h);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf
    }

    fn contains(buf: &Buffer, needle: &str) -> bool {
        let area = buf.area;
        (area.top()..area.bottom()).any(|y| {
            let line: String = (area.left()..area.right())
                .map(|x| buf[(x, y)].symbol().to_string())
                .collect();
            line.contains(needle)
        })
    }

    #[test]
    fn test_pieces_to_unicode() {
        assert_eq!(piece_to_unicode(Piece::King, ChessColor::White), "\u{2654}");
        assert_eq!(piece_to_unicode(Piece::Pawn, ChessColor::Black), "\u{265f}");
    }

    #[test]
    fn test_highlight_priority() {
        let placement = Placement::empty();
        let widget = BoardWidget {
            placement: &placement,
            selected: Some(sq("e2")),
            dests: sq("e4").bitboard() | sq("e3").bitboard(),
            last_move: Some((Some(sq("e3")), sq("d4"))),
            pockets: None,
            flipped: false,
            title: "",
        };
        assert_eq!(widget.highlight(sq("e2")), SquareHighlight::Selected);
        assert_eq!(widget.highlight(sq("e3")), SquareHighlight::LegalMove);
        assert_eq!(widget.highlight(sq("d4")), SquareHighlight::LastMove);
        assert_eq!(widget.highlight(sq("a1")), SquareHighlight::None);
    }

    #[test]
    fn test_renders_pieces_and_pockets() {
        let placement = Placement::from_fen(chess::fen::STARTING_FEN).unwrap();
        let pockets = Pockets::new().with(ChessColor::White, Piece::Queen, 2);
        let buf = render(BoardWidget {
            placement: &placement,
            selected: None,
            dests: BitBoard::EMPTY,
            last_move: None,
            pockets: Some(&pockets),
            flipped: false,
            title: "Board",
        });
        assert!(contains(&buf, "\u{2654}"));
        assert!(contains(&buf, "\u{265a}"));
        assert!(contains(&buf, "x2"));
    }

    #[test]
    fn test_small_area_does_not_panic() {
        let placement = Placement::empty();
        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        BoardWidget {
            placement: &placement,
            selected: None,
            dests: BitBoard::EMPTY,
            last_move: None,
            pockets: None,
            flipped: true,
            title: "",
        }
        .render(area, &mut buf);
        assert!(contains(&buf, "Terminal"));
    }
}
