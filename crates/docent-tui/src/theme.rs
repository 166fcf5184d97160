//! Color theme

use ratatui::style::{Color, Modifier, Style};

/// Colors used across the chat view
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    /// Secondary text (hints, timestamps, tree guides)
    pub dim: Color,
    /// Focus, prompts and the user's messages
    pub accent: Color,
    /// Replies from the assistant
    pub reply: Color,
    pub error: Color,
    /// Transient notices
    pub notice: Color,
    pub border: Color,
    /// Cursor row in lists
    pub highlight_bg: Color,
    /// Folder names in the file panel
    pub folder: Color,
    /// Selected files
    pub selected: Color,
    pub code: Color,
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            reply: Color::Green,
            error: Color::Red,
            notice: Color::Yellow,
            border: Color::DarkGray,
            highlight_bg: Color::DarkGray,
            folder: Color::Blue,
            selected: Color::Green,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            reply: Color::Rgb(0, 120, 60),
            error: Color::Red,
            notice: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            highlight_bg: Color::LightBlue,
            folder: Color::Blue,
            selected: Color::Rgb(0, 120, 60),
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    /// Pick a theme by name, falling back to dark
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent_style().add_modifier(Modifier::BOLD)
    }

    pub fn reply_bold(&self) -> Style {
        Style::default().fg(self.reply).add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn notice_style(&self) -> Style {
        Style::default().fg(self.notice).add_modifier(Modifier::BOLD)
    }

    pub fn folder_style(&self) -> Style {
        Style::default().fg(self.folder).add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default().fg(self.selected)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    /// Border style, brighter when the pane has focus
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.accent_style()
        } else {
            Style::default().fg(self.border)
        }
    }

    /// Style of the cursor row in a list
    pub fn highlight_style(&self) -> Style {
        Style::default()
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }
}
