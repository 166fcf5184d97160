//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Char(char),
    /// Enter
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Mouse wheel up
    ScrollUp,
    /// Mouse wheel down
    ScrollDown,
    /// Tab / Shift+Tab: switch between the file panel and the chat
    SwitchFocus,
    /// Escape
    Cancel,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+R (reload the file list)
    Refresh,
    /// Ctrl+L (clear the transcript)
    Clear,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    Paste(String),
    /// Ctrl+Q
    Quit,
    Unknown,
}

impl Action {
    /// Whether this action is a user scroll gesture
    pub fn is_scroll(&self) -> bool {
        matches!(
            self,
            Action::PageUp | Action::PageDown | Action::ScrollUp | Action::ScrollDown
        )
    }
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('l') => Action::Clear,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchFocus,
        KeyCode::Esc => Action::Cancel,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
///
/// Key releases and mouse events other than the wheel are dropped.
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(key_to_action(key)),
        Event::Paste(text) => Some(Action::Paste(text)),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(Action::ScrollUp),
            MouseEventKind::ScrollDown => Some(Action::ScrollDown),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseEvent};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Interrupt
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            Action::Refresh
        );
    }

    #[test]
    fn test_tab_switches_focus() {
        assert_eq!(
            key_to_action(key(KeyCode::Tab, KeyModifiers::NONE)),
            Action::SwitchFocus
        );
        assert_eq!(
            key_to_action(key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Action::SwitchFocus
        );
    }

    #[test]
    fn test_mouse_wheel_is_scroll() {
        let wheel = Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        let action = event_to_action(wheel).unwrap();
        assert_eq!(action, Action::ScrollUp);
        assert!(action.is_scroll());
        assert!(!Action::Char('x').is_scroll());
    }

    #[test]
    fn test_release_ignored() {
        let mut release = key(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(event_to_action(Event::Key(release)), None);
    }
}
