//! Query input line

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Single-line editor for the next query.
///
/// While disabled (a reply is streaming) edits are ignored and the disabled
/// placeholder is shown.
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position in characters
    cursor: usize,
    /// First visible display column
    scroll: usize,
    placeholder: String,
    disabled_placeholder: String,
    focused: bool,
    disabled: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_disabled_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.disabled_placeholder = placeholder.into();
        self
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map_or(self.content.len(), |(i, _)| i)
    }

    fn cursor_column(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the characters in `[from, to)` (character indices)
    fn remove_range(&mut self, from: usize, to: usize) {
        let start = self.byte_at(from);
        let end = self.byte_at(to);
        self.content.drain(start..end);
    }

    fn word_start_before_cursor(&self) -> usize {
        let chars: Vec<char> = self.content.chars().collect();
        let mut idx = self.cursor;
        while idx > 0 && chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
        while idx > 0 && !chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
        idx
    }

    /// Apply an editing action. Returns whether the action was consumed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        if self.disabled {
            return false;
        }

        let consumed = match action {
            Action::Char(c) => {
                self.insert(*c);
                true
            }
            Action::Paste(text) => {
                // single line: line breaks become one space
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert(' ');
                        }
                    } else {
                        self.insert(c);
                    }
                }
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_range(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                true
            }
            Action::Delete if self.cursor < self.char_count() => {
                self.remove_range(self.cursor, self.cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < self.char_count() => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = self.char_count();
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let start = self.word_start_before_cursor();
                self.remove_range(start, self.cursor);
                self.cursor = start;
                true
            }
            _ => false,
        };

        if consumed {
            self.update_scroll(width as usize);
        }
        consumed
    }

    fn update_scroll(&mut self, width: usize) {
        let visible = width.saturating_sub(4);
        let column = self.cursor_column();
        if column < self.scroll {
            self.scroll = column;
        } else if visible > 0 && column >= self.scroll + visible {
            self.scroll = column + 1 - visible;
        }
    }

    /// Visible slice of the content, starting at the scroll column
    fn visible_text(&self, width: usize) -> String {
        let mut column = 0;
        let mut used = 0;
        let mut out = String::new();
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if column < self.scroll {
                column += w;
                continue;
            }
            if used + w > width {
                break;
            }
            out.push(c);
            used += w;
        }
        out
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style(self.focused && !self.disabled));
        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.disabled {
            (self.disabled_placeholder.clone(), theme.dim_style())
        } else if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (self.visible_text(inner.width as usize), theme.base_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused && !self.disabled && inner.width > 0 {
            let x = self.cursor_column().saturating_sub(self.scroll);
            if x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 80);
        }
        input
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut input = typed("héllo");
        assert_eq!(input.content(), "héllo");
        input.handle_action(&Action::Backspace, 80);
        assert_eq!(input.content(), "héll");
        input.handle_action(&Action::Home, 80);
        assert!(!input.handle_action(&Action::Backspace, 80));
        input.handle_action(&Action::Delete, 80);
        assert_eq!(input.content(), "éll");
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("summarize the  contract");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "summarize the  ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "summarize ");
    }

    #[test]
    fn test_paste_flattens_lines() {
        let mut input = typed("a");
        input.handle_action(&Action::Paste("b\r\nc".into()), 80);
        assert_eq!(input.content(), "ab c");
    }

    #[test]
    fn test_disabled_ignores_edits() {
        let mut input = typed("draft");
        input.set_disabled(true);
        assert!(!input.handle_action(&Action::Char('x'), 80));
        assert!(!input.handle_action(&Action::ClearLine, 80));
        assert_eq!(input.content(), "draft");

        input.set_disabled(false);
        assert!(input.handle_action(&Action::Char('!'), 80));
        assert_eq!(input.content(), "draft!");
    }

    #[test]
    fn test_scrolls_to_cursor() {
        let input = typed(&"x".repeat(30));
        // 10 columns wide, 6 visible after borders and padding
        let mut narrow = InputBox::new();
        for c in input.content().chars() {
            narrow.handle_action(&Action::Char(c), 10);
        }
        assert_eq!(narrow.scroll, 25);
        assert_eq!(narrow.visible_text(6).len(), 5);
    }

    #[test]
    fn test_render_disabled_placeholder() {
        let mut input = InputBox::new().with_disabled_placeholder("Waiting for reply...");
        input.set_disabled(true);
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &Theme::dark());

        let row: String = (1..29)
            .map(|x| buf[(x, 1)].symbol().to_string())
            .collect();
        assert!(row.starts_with("Waiting for reply..."));
    }
}
