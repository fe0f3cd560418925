use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

pub const FOCUSED_HINT: &str = "Enter SAN (Nc3) or UCI (b1c3) moves, or type / to focus chat";
pub const BLURRED_HINT: &str = "Press <enter> to focus";

/// The keyboard move text field.
pub struct KeyboardMoveWidget<'a> {
    pub text: &'a str,
    pub focused: bool,
    /// Shown in place of the hint after a rejected line.
    pub feedback: Option<&'a str>,
    /// Whether a parser is attached yet.
    pub ready: bool,
}

impl KeyboardMoveWidget<'_> {
    fn hint(&self) -> &str {
        if !self.ready {
            "Loading move input..."
        } else if self.focused {
            FOCUSED_HINT
        } else {
            BLURRED_HINT
        }
    }
}

impl Widget for KeyboardMoveWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title("Move");
        let inner = block.inner(area);
        block.render(area, buf);

        let line = if !self.text.is_empty() {
            let mut spans = vec![Span::styled(
                self.text.to_string(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )];
            if self.focused {
                spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            }
            Line::from(spans)
        } else if let Some(feedback) = self.feedback {
            Line::from(Span::styled(feedback.to_string(), Style::default().fg(Color::Red)))
        } else {
            Line::from(Span::styled(
                self.hint().to_string(),
                Style::default().fg(Color::DarkGray),
            ))
        };

        Paragraph::new(line).render(inner, buf);
    }
}
