//! Transcript widget

use crate::theme::Theme;
use crate::widgets::{markdown::render_markdown, spinner::frame_at};
use docent_core::{Message, Sender};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Instant;

const INDENT: &str = "  ";

/// Render one message into wrapped lines, including the trailing separator
fn message_lines(msg: &Message, theme: &Theme, width: usize, started: Instant) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let (label, style, prefix) = match msg.sender {
        Sender::User => ("You", theme.accent_bold(), "▶ "),
        Sender::System if msg.is_error => ("Error", theme.error_style(), "✖ "),
        Sender::System => ("Docent", theme.reply_bold(), "◀ "),
    };
    let header = if msg.streaming {
        format!("{}{} ▌", prefix, label)
    } else {
        format!("{}{}", prefix, label)
    };
    lines.push(Line::from(Span::styled(header, style)));

    let content_width = width.saturating_sub(INDENT.len()).max(1);

    if msg.streaming && msg.content.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{}{} thinking...", INDENT, frame_at(started.elapsed())),
            theme.dim_style(),
        )));
    } else if msg.sender == Sender::System && !msg.is_error {
        for line in render_markdown(&msg.content, theme, content_width) {
            let mut spans = vec![Span::raw(INDENT)];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
    } else {
        let style = if msg.is_error {
            theme.error_style()
        } else {
            theme.base_style()
        };
        for line in textwrap::wrap(&msg.content, content_width) {
            lines.push(Line::from(Span::styled(format!("{}{}", INDENT, line), style)));
        }
    }

    lines.push(Line::default());
    lines
}

/// Every line of the transcript at `width`
fn transcript_lines(messages: &[Message], theme: &Theme, width: usize, started: Instant) -> Vec<Line<'static>> {
    messages
        .iter()
        .flat_map(|m| message_lines(m, theme, width, started))
        .collect()
}

/// Transcript laid out for one frame.
///
/// The lines are built once; the height and the visible window both come
/// from them.
pub struct MessageList {
    lines: Vec<Line<'static>>,
    scroll: usize,
}

impl MessageList {
    /// Lay out `messages` at `width` columns
    pub fn new(messages: &[Message], theme: &Theme, width: u16, started: Instant) -> Self {
        Self {
            lines: transcript_lines(messages, theme, width as usize, started),
            scroll: 0,
        }
    }

    /// Rendered height in rows
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// First visible row
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let visible: Vec<Line> = self
            .lines
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();
        Paragraph::new(visible)
            .style(Style::default())
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::Transcript;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_height_matches_lines() {
        let mut t = Transcript::with_welcome("Welcome!\nAsk me anything.");
        t.push_user("what is in the **contract**? ".repeat(6));
        t.begin_stream().unwrap();
        t.append_stream("| a | b |\n|---|---|\n| 1 | 2 |").unwrap();

        let theme = Theme::dark();
        for width in [20u16, 40, 80] {
            let lines = transcript_lines(t.messages(), &theme, width as usize, Instant::now());
            let list = MessageList::new(t.messages(), &theme, width, Instant::now());
            assert_eq!(list.height(), lines.len());
            assert!(lines.iter().all(|l| l.width() <= width as usize));
        }
    }

    #[test]
    fn test_empty_stream_shows_thinking() {
        let mut t = Transcript::new();
        t.begin_stream().unwrap();
        let lines = plain(&transcript_lines(t.messages(), &Theme::dark(), 40, Instant::now()));
        assert_eq!(lines[0], "◀ Docent ▌");
        assert!(lines[1].ends_with("thinking..."));
    }

    #[test]
    fn test_error_message_header() {
        let mut t = Transcript::new();
        t.push_error("An error occurred: reset");
        let lines = plain(&transcript_lines(t.messages(), &Theme::dark(), 40, Instant::now()));
        assert_eq!(lines, vec!["✖ Error", "  An error occurred: reset", ""]);
    }

    #[test]
    fn test_render_scrolled() {
        let mut t = Transcript::new();
        for i in 0..5 {
            t.push_user(format!("message {}", i));
        }
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        MessageList::new(t.messages(), &theme, area.width, Instant::now())
            .scroll(3)
            .render(area, &mut buf);

        let first_row: String = (0..30).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(first_row.starts_with("▶ You"));
        let second_row: String = (0..30).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(second_row.starts_with("  message 1"));
    }
}
