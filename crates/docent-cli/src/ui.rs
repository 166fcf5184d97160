//! TUI implementation for docent

use tokio::sync::mpsc::{self, error::TrySendError};

use crossterm::event::EventStream;
use docent_api::ChatRequest;
use docent_core::{ChatEngine, ChatView, IdleTick, ReplyEvent, SubmitError};
use docent_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{
        FolderTree, InputBox, MessageList, Spinner, TreeEntry, TreeRow, TreeState,
        folder_tree::visible_rows,
    },
};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::collections::VecDeque;
use std::time::Instant;

/// Width of the file panel
const FILES_WIDTH: u16 = 34;
/// Rows moved per mouse wheel notch
const WHEEL_ROWS: isize = 3;

/// Messages sent from UI to the session handler
#[derive(Debug)]
pub enum UiMessage {
    /// Slash command
    Command(String),
    /// Reload the file list
    Refresh,
    /// User requested abort of the current reply
    Abort,
    /// User requested quit
    Quit,
}

/// What the reply loop does with a message that arrives mid-reply
#[derive(Debug)]
enum InFlight {
    Cancel,
    Quit,
    /// Handled once the reply has ended
    Defer(UiMessage),
}

fn in_flight(msg: Option<UiMessage>) -> InFlight {
    match msg {
        Some(UiMessage::Abort) => InFlight::Cancel,
        Some(UiMessage::Quit) | None => InFlight::Quit,
        Some(other) => InFlight::Defer(other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Files,
    Input,
}

/// TUI application state
pub struct TuiState {
    /// Transcript, selection and scroll state
    view: ChatView,
    input: InputBox,
    /// File panel rows and cursor
    rows: Vec<TreeRow>,
    tree: TreeState,
    focus: Focus,
    /// Current status message
    status: String,
    title: String,
    theme: Theme,
    /// Spinner start time for animation
    spinner_start: Instant,
    /// Accepted query waiting for its reply
    pending: Option<ChatRequest>,
    ui_tx: mpsc::Sender<UiMessage>,
}

impl TuiState {
    pub fn new(view: ChatView, theme: Theme, title: String, ui_tx: mpsc::Sender<UiMessage>) -> Self {
        let mut input = InputBox::new()
            .with_placeholder("Ask about your documents...")
            .with_disabled_placeholder("Waiting for the reply...");
        input.set_focused(true);

        let mut state = Self {
            view,
            input,
            rows: Vec::new(),
            tree: TreeState::default(),
            focus: Focus::Input,
            status: "Ready".to_string(),
            title,
            theme,
            spinner_start: Instant::now(),
            pending: None,
            ui_tx,
        };
        state.refresh_rows();
        state
    }

    fn refresh_rows(&mut self) {
        let view = &self.view;
        self.rows = visible_rows(view.index(), |path| view.is_open(path));
        self.tree.clamp(self.rows.len());
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.input.set_focused(focus == Focus::Input);
    }

    /// Toggle the folder or file under the cursor
    fn toggle_row(&mut self) {
        let Some(row) = self.rows.get(self.tree.cursor).cloned() else {
            return;
        };
        match row.entry {
            TreeEntry::Folder { path, .. } => {
                self.view.toggle_folder(&path);
                self.refresh_rows();
            }
            TreeEntry::File(file) => match self.view.toggle_file(&file) {
                Ok(toggled) => tracing::debug!("{:?} {}", toggled, file.file_id),
                Err(e) => tracing::debug!("selection refused: {}", e),
            },
        }
    }

    /// Replace the file list after a refresh
    pub fn set_files(&mut self, files: Vec<docent_api::FileRecord>) {
        self.view.set_files(files);
        self.refresh_rows();
    }

    fn page_rows(&self) -> isize {
        self.view.viewport().metrics().viewport_height.max(1) as isize
    }

    /// Queue a message for the session loop. Never waits: the loop may be
    /// the caller.
    fn send(&mut self, msg: UiMessage) {
        match self.ui_tx.try_send(msg) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(msg)) => {
                tracing::warn!("ui queue full, dropping {:?}", msg);
                self.view.show_notice("Still working, try again");
            }
        }
    }

    /// Take the accepted query, if any
    pub fn take_pending(&mut self) -> Option<ChatRequest> {
        self.pending.take()
    }

    /// Handle keyboard action. Returns false when the UI should exit.
    pub fn handle_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Quit => {
                self.send(UiMessage::Quit);
                return false;
            }
            Action::Interrupt | Action::Cancel => {
                if self.pending.take().is_some() {
                    // Reply not opened yet
                    self.view.apply(ReplyEvent::Cancelled);
                    self.status = "Ready".to_string();
                    return true;
                }
                if self.view.is_busy() {
                    self.send(UiMessage::Abort);
                    self.status = "Cancelling...".to_string();
                    return true;
                }
                self.send(UiMessage::Quit);
                return false;
            }
            Action::SwitchFocus => {
                let next = match self.focus {
                    Focus::Files => Focus::Input,
                    Focus::Input => Focus::Files,
                };
                self.set_focus(next);
                return true;
            }
            Action::Refresh => {
                self.send(UiMessage::Refresh);
                return true;
            }
            Action::Clear => {
                if self.view.clear_transcript() {
                    self.status = "Cleared".to_string();
                } else {
                    self.view.show_notice("Wait for the reply to finish");
                }
                return true;
            }
            Action::PageUp => {
                self.view.scroll_by(-self.page_rows());
                return true;
            }
            Action::PageDown => {
                self.view.scroll_by(self.page_rows());
                return true;
            }
            Action::ScrollUp => {
                self.view.scroll_by(-WHEEL_ROWS);
                return true;
            }
            Action::ScrollDown => {
                self.view.scroll_by(WHEEL_ROWS);
                return true;
            }
            _ => {}
        }

        match self.focus {
            Focus::Files => match action {
                Action::Up => self.tree.up(self.rows.len()),
                Action::Down => self.tree.down(self.rows.len()),
                Action::Submit | Action::Char(' ') => self.toggle_row(),
                _ => {}
            },
            Focus::Input => match action {
                Action::Submit => self.submit(),
                other => {
                    self.input.handle_action(&other, width);
                }
            },
        }
        true
    }

    fn submit(&mut self) {
        let content = self.input.content().trim().to_string();
        if content.starts_with('/') {
            self.input.clear();
            self.send(UiMessage::Command(content));
            return;
        }

        match self.view.submit(&content) {
            Ok(request) => {
                self.input.clear();
                self.spinner_start = Instant::now();
                self.status = "Thinking...".to_string();
                self.pending = Some(request);
            }
            Err(SubmitError::Empty) => {}
            Err(e @ SubmitError::Busy) => self.view.show_notice(e.to_string()),
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Layout: files (fixed) | chat (flex)
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(FILES_WIDTH), Constraint::Min(1)])
            .split(size);

        // Chat: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Messages
                Constraint::Length(1), // Status
                Constraint::Length(3), // Input
            ])
            .split(columns[1]);

        let tree = FolderTree::new(&self.rows, self.view.selection(), &self.theme)
            .focused(self.focus == Focus::Files);
        frame.render_stateful_widget(tree, columns[0], &mut self.tree);

        self.render_messages(frame, chunks[0]);
        self.render_status(frame, chunks[1]);

        self.input.set_disabled(self.view.is_busy());
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(" docent │ {} ", self.title);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focus == Focus::Input))
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let message_list = MessageList::new(
            self.view.transcript().messages(),
            &self.theme,
            inner.width,
            self.spinner_start,
        );
        let content_height = message_list.height();
        self.view.set_extent(content_height, inner.height as usize);
        let offset = self.view.viewport().offset();
        frame.render_widget(message_list.scroll(offset), inner);

        // Render scrollbar if content overflows
        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(offset)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if let Some(notice) = self.view.notice() {
            let line = Line::from(Span::styled(notice.text.as_str(), self.theme.notice_style()));
            frame.render_widget(Paragraph::new(line), area);
            return;
        }

        if self.view.is_busy() {
            let spinner = Spinner::new(&self.status, &self.theme, self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let selection = self.view.selection();
        let left_content = match selection.active_folder() {
            Some(folder) => format!("{} │ {} file(s) in {}", self.status, selection.len(), folder),
            None => format!("{} │ all files", self.status),
        };
        let right_content = "Tab: focus │ Ctrl+R: refresh │ Ctrl+L: clear │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left_content, self.theme.dim_style()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left_content, self.theme.dim_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Run the TUI application
pub async fn run_tui(
    engine: &ChatEngine,
    view: ChatView,
    mut idle_rx: mpsc::UnboundedReceiver<IdleTick>,
    theme: Theme,
    title: String,
) -> anyhow::Result<()> {
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);

    // Load files once the first frame is up
    ui_tx.send(UiMessage::Refresh).await?;

    let mut state = TuiState::new(view, theme, title, ui_tx);

    // Event stream
    let mut event_stream = EventStream::new();

    // Tick interval for animations (80ms for smooth spinner)
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    // Messages that arrived while a reply streamed
    let mut deferred: VecDeque<UiMessage> = VecDeque::new();

    let result = loop {
        if let Some(request) = state.take_pending() {
            // The reply installs a fresh token, so the handle always cancels it
            let mut reply = engine.reply(request);
            let cancel_handle = engine.cancel_handle();
            let mut quit = false;

            // Poll the reply alongside other events until it ends
            loop {
                terminal.draw(|frame| state.render(frame))?;
                let area_width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    // Drained first so an abort queued before the reply opened still lands
                    msg = ui_rx.recv() => {
                        match in_flight(msg) {
                            InFlight::Cancel => {
                                cancel_handle.lock().cancel();
                                state.status = "Cancelling...".to_string();
                            }
                            InFlight::Quit => {
                                cancel_handle.lock().cancel();
                                quit = true;
                            }
                            InFlight::Defer(msg) => deferred.push_back(msg),
                        }
                    }

                    event = reply.next() => {
                        match event {
                            Some(event) => {
                                let terminal_event = event.is_terminal();
                                state.view.apply(event);
                                if terminal_event {
                                    state.status = "Ready".to_string();
                                }
                            }
                            None => break,
                        }
                    }

                    tick = idle_rx.recv() => {
                        if let Some(tick) = tick {
                            state.view.on_idle(tick);
                        }
                    }

                    // Input works while a reply streams
                    event = event_stream.next() => {
                        match event {
                            Some(Ok(event)) => {
                                if let Some(action) = event_to_action(event) {
                                    match action {
                                        Action::Interrupt | Action::Cancel => {
                                            cancel_handle.lock().cancel();
                                            state.status = "Cancelling...".to_string();
                                        }
                                        Action::Quit => {
                                            cancel_handle.lock().cancel();
                                            quit = true;
                                        }
                                        other => {
                                            state.handle_action(other, area_width);
                                        }
                                    }
                                }
                            }
                            Some(Err(_)) | None => {
                                cancel_handle.lock().cancel();
                                quit = true;
                            }
                        }
                    }

                    _ = tick_interval.tick() => {
                        state.view.tick();
                    }
                }
            }

            if quit {
                break Ok(());
            }
            continue;
        }

        if let Some(msg) = deferred.pop_front() {
            if !handle_ui_message(engine, &mut state, msg).await {
                break Ok(());
            }
            continue;
        }

        // Render
        terminal.draw(|frame| state.render(frame))?;

        let area_width = terminal.size()?.width;

        tokio::select! {
            biased;

            tick = idle_rx.recv() => {
                if let Some(tick) = tick {
                    state.view.on_idle(tick);
                }
            }

            // Handle terminal events (keyboard input)
            event = event_stream.next() => {
                match event {
                    Some(Ok(event)) => {
                        if let Some(action) = event_to_action(event) {
                            if !state.handle_action(action, area_width) {
                                break Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        break Err(anyhow::anyhow!("Event error: {}", e));
                    }
                    None => {
                        break Ok(());
                    }
                }
            }

            // Tick for animations (smooth scroll, notice expiry)
            _ = tick_interval.tick() => {
                state.view.tick();
            }

            // Handle UI messages (command, refresh, abort, quit)
            msg = ui_rx.recv() => {
                let Some(msg) = msg else { break Ok(()) };
                if !handle_ui_message(engine, &mut state, msg).await {
                    break Ok(());
                }
            }
        }
    };

    state.view.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// Handle a message outside a reply. Returns false when the UI should exit.
async fn handle_ui_message(engine: &ChatEngine, state: &mut TuiState, msg: UiMessage) -> bool {
    use crate::commands::{CommandResult, execute_command};

    match msg {
        UiMessage::Command(cmd) => {
            let Some(result) = execute_command(&cmd, &state.view) else {
                return true;
            };
            match result {
                CommandResult::Message(msg) => {
                    if !state.view.push_info(msg) {
                        state.view.show_notice("Wait for the reply to finish");
                    }
                }
                CommandResult::Clear => {
                    if state.view.clear_transcript() {
                        state.status = "Cleared".to_string();
                    }
                }
                CommandResult::Refresh => refresh_files(engine, state).await,
                CommandResult::Exit => return false,
                CommandResult::Unknown(cmd) => {
                    state
                        .view
                        .show_notice(format!("Unknown command: /{} (try /help)", cmd));
                }
            }
        }
        UiMessage::Refresh => refresh_files(engine, state).await,
        // Only reaches here once the reply is gone
        UiMessage::Abort => engine.abort(),
        UiMessage::Quit => return false,
    }
    true
}

async fn refresh_files(engine: &ChatEngine, state: &mut TuiState) {
    state.status = "Loading files...".to_string();
    match engine.try_list_files().await {
        Ok(files) => {
            state.status = format!("{} file(s)", files.len());
            state.set_files(files);
        }
        Err(e) => {
            tracing::warn!("file refresh failed: {}", e);
            state.view.show_notice(format!("Could not load files: {}", e));
            state.status = "Ready".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::ScrollConfig;
    use uuid::Uuid;

    fn state(capacity: usize) -> (TuiState, mpsc::Receiver<UiMessage>) {
        let (view, _idle) = ChatView::new(ScrollConfig::default(), Uuid::nil());
        let (tx, rx) = mpsc::channel(capacity);
        (TuiState::new(view, Theme::dark(), "test".into(), tx), rx)
    }

    fn type_and_submit(state: &mut TuiState, text: &str) {
        for c in text.chars() {
            state.handle_action(Action::Char(c), 80);
        }
        state.handle_action(Action::Submit, 80);
    }

    #[tokio::test]
    async fn test_refresh_never_waits_on_full_queue() {
        let (mut state, mut rx) = state(1);
        for _ in 0..40 {
            assert!(state.handle_action(Action::Refresh, 80));
        }

        assert!(matches!(rx.try_recv(), Ok(UiMessage::Refresh)));
        assert!(rx.try_recv().is_err());
        assert!(state.view.notice().is_some());
    }

    #[tokio::test]
    async fn test_submit_is_held_until_taken() {
        let (mut state, mut rx) = state(4);
        type_and_submit(&mut state, "what changed?");

        assert!(state.view.is_busy());
        assert!(rx.try_recv().is_err());
        let request = state.take_pending().unwrap();
        assert_eq!(request.query, "what changed?");
        assert!(state.take_pending().is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_reply_opens() {
        let (mut state, mut rx) = state(4);
        type_and_submit(&mut state, "hello");
        assert!(state.view.is_busy());

        assert!(state.handle_action(Action::Cancel, 80));
        assert!(!state.view.is_busy());
        assert!(state.take_pending().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_open_reply_sends_abort() {
        let (mut state, mut rx) = state(4);
        type_and_submit(&mut state, "hello");
        let _request = state.take_pending().unwrap();

        assert!(state.handle_action(Action::Cancel, 80));
        assert!(matches!(rx.try_recv(), Ok(UiMessage::Abort)));
        assert_eq!(state.status, "Cancelling...");
    }

    #[tokio::test]
    async fn test_cancel_when_idle_quits() {
        let (mut state, mut rx) = state(4);
        assert!(!state.handle_action(Action::Cancel, 80));
        assert!(matches!(rx.try_recv(), Ok(UiMessage::Quit)));
    }

    #[test]
    fn test_messages_during_reply() {
        assert!(matches!(in_flight(Some(UiMessage::Abort)), InFlight::Cancel));
        assert!(matches!(in_flight(Some(UiMessage::Quit)), InFlight::Quit));
        assert!(matches!(in_flight(None), InFlight::Quit));
        assert!(matches!(
            in_flight(Some(UiMessage::Refresh)),
            InFlight::Defer(UiMessage::Refresh)
        ));
        assert!(matches!(
            in_flight(Some(UiMessage::Command("/files".into()))),
            InFlight::Defer(UiMessage::Command(c)) if c == "/files"
        ));
    }
}
