//! Per-view session state: transcript, file scope, and scroll reconciliation

use docent_api::{ChatRequest, FileRecord};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    engine::ReplyEvent,
    folder::FolderIndex,
    scroll::{IdleTick, ScrollConfig, ScrollTracker, Viewport},
    selection::{Selection, SelectionError, Toggled},
    transcript::Transcript,
};

/// Greeting shown in a fresh transcript
pub const WELCOME: &str = "Welcome to Agentic Customer Support!\nI can help with all the FAQs related to 'Hack the Future' and many more domain. Please check top right corner to know about me.";

/// How long a notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(2);

/// Why a submission was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("query is empty")]
    Empty,
    #[error("a reply is still in progress")]
    Busy,
}

/// Transient message that expires on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

/// State of one chat view
#[derive(Debug)]
pub struct ChatView {
    transcript: Transcript,
    files: Vec<FileRecord>,
    index: FolderIndex,
    selection: Selection,
    open_folders: BTreeSet<String>,
    tracker: ScrollTracker,
    viewport: Viewport,
    busy: bool,
    notice: Option<Notice>,
    user_id: Uuid,
    welcome: String,
}

impl ChatView {
    /// Create a view and the receiver its scroll idle ticks arrive on
    pub fn new(scroll: ScrollConfig, user_id: Uuid) -> (Self, mpsc::UnboundedReceiver<IdleTick>) {
        let (tracker, idle_rx) = ScrollTracker::new(scroll);
        let view = Self {
            transcript: Transcript::with_welcome(WELCOME),
            files: Vec::new(),
            index: FolderIndex::default(),
            selection: Selection::new(),
            open_folders: BTreeSet::new(),
            tracker,
            viewport: Viewport::new(),
            busy: false,
            notice: None,
            user_id,
            welcome: WELCOME.to_string(),
        };
        (view, idle_rx)
    }

    /// Replace the greeting; a fresh transcript is reseeded with it
    pub fn with_welcome(mut self, text: impl Into<String>) -> Self {
        self.welcome = text.into();
        if self.transcript.len() <= 1 && !self.busy {
            self.transcript = Transcript::with_welcome(self.welcome.clone());
        }
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn index(&self) -> &FolderIndex {
        &self.index
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn tracker(&self) -> &ScrollTracker {
        &self.tracker
    }

    /// Whether a reply is in flight (input is disabled)
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_open(&self, folder_path: &str) -> bool {
        self.open_folders.contains(folder_path)
    }

    /// Submit a query.
    ///
    /// On success the user message is in the transcript, the view follows new
    /// content, and the returned request is scoped to the current selection.
    pub fn submit(&mut self, query: &str) -> Result<ChatRequest, SubmitError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.busy {
            return Err(SubmitError::Busy);
        }

        self.transcript.push_user(query);
        self.busy = true;
        let command = self.tracker.on_submit();
        self.viewport.apply(command);

        Ok(ChatRequest::new(query, self.user_id).with_scope(
            self.selection.file_ids(),
            self.selection.active_folder().map(str::to_string),
        ))
    }

    /// Apply a reply event to the transcript and reconcile scrolling
    pub fn apply(&mut self, event: ReplyEvent) {
        match event {
            ReplyEvent::Opened => {
                if let Err(e) = self.transcript.begin_stream() {
                    tracing::warn!("cannot open reply message: {}", e);
                }
            }
            ReplyEvent::Delta(text) => {
                if let Err(e) = self.transcript.append_stream(&text) {
                    tracing::warn!("dropping reply text: {}", e);
                }
            }
            ReplyEvent::Finished | ReplyEvent::Cancelled => {
                self.transcript.finish_stream();
                self.busy = false;
            }
            ReplyEvent::Failed { reason, phase } => {
                tracing::debug!("reply failed during {:?}", phase);
                self.transcript
                    .push_error(format!("An error occurred: {}", reason));
                self.busy = false;
            }
        }

        if let Some(command) = self.tracker.on_content_update() {
            self.viewport.apply(command);
        }
    }

    /// Replace the file list, rebuilding the index and pruning stale state
    pub fn set_files(&mut self, files: Vec<FileRecord>) {
        self.index = FolderIndex::build(&files);
        self.selection.retain_existing(&files);
        let index = &self.index;
        self.open_folders.retain(|path| index.find(path).is_some());
        self.files = files;
    }

    /// Toggle a file in the selection; a refusal is shown as a notice
    pub fn toggle_file(&mut self, file: &FileRecord) -> Result<Toggled, SelectionError> {
        self.selection.toggle(file).inspect_err(|e| {
            self.notice = Some(Notice {
                text: e.to_string(),
                expires_at: Instant::now() + NOTICE_TTL,
            });
        })
    }

    /// Open or close a folder in the file panel; returns whether it is now open
    pub fn toggle_folder(&mut self, folder_path: &str) -> bool {
        if self.open_folders.remove(folder_path) {
            false
        } else {
            self.open_folders.insert(folder_path.to_string());
            true
        }
    }

    /// Show a transient notice
    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    /// Show local output, such as a command result, in the transcript.
    /// Refused while a reply streams.
    pub fn push_info(&mut self, text: impl Into<String>) -> bool {
        if self.busy {
            return false;
        }
        self.transcript.push_system(text);
        if let Some(command) = self.tracker.on_content_update() {
            self.viewport.apply(command);
        }
        true
    }

    /// Record the rendered transcript height and the visible rows
    pub fn set_extent(&mut self, content_height: usize, viewport_height: usize) {
        self.viewport.set_extent(content_height, viewport_height);
    }

    /// A user scroll gesture
    pub fn scroll_by(&mut self, delta: isize) {
        let metrics = self.viewport.scroll_by(delta);
        self.tracker.on_scroll(metrics);
    }

    pub fn on_idle(&mut self, tick: IdleTick) {
        if let Some(command) = self.tracker.on_idle(tick) {
            self.viewport.apply(command);
        }
    }

    /// Advance animations and expire notices; returns whether a redraw is due
    pub fn tick(&mut self) -> bool {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| Instant::now() >= n.expires_at);
        if expired {
            self.notice = None;
        }
        let moved = self.viewport.tick();
        expired || moved
    }

    /// Clear the transcript back to the greeting. Refused while busy.
    pub fn clear_transcript(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.transcript = Transcript::with_welcome(self.welcome.clone());
        true
    }

    /// Stop timers. The transcript is left as it is.
    pub fn teardown(&mut self) {
        self.tracker.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FailurePhase;
    use crate::transcript::Sender;

    fn view() -> (ChatView, mpsc::UnboundedReceiver<IdleTick>) {
        ChatView::new(ScrollConfig::default(), Uuid::nil())
    }

    fn file(id: &str, folder: &str) -> FileRecord {
        FileRecord::new(id, format!("{}.pdf", id), folder)
    }

    fn stream_reply(view: &mut ChatView, parts: &[&str]) {
        view.apply(ReplyEvent::Opened);
        for part in parts {
            view.apply(ReplyEvent::Delta(part.to_string()));
        }
    }

    #[tokio::test]
    async fn test_fresh_view_has_welcome() {
        let (view, _rx) = view();
        assert_eq!(view.transcript().len(), 1);
        assert!(view.transcript().messages()[0].content.starts_with("Welcome"));
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_and_concurrent() {
        let (mut view, _rx) = view();
        assert_eq!(view.submit("   "), Err(SubmitError::Empty));

        view.submit("first").unwrap();
        assert_eq!(view.submit("second"), Err(SubmitError::Busy));
        assert_eq!(view.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_serializes_selection() {
        let (mut view, _rx) = view();
        view.set_files(vec![file("1", "A"), file("3", "A"), file("2", "B")]);
        view.toggle_file(&file("3", "A")).unwrap();
        view.toggle_file(&file("1", "A")).unwrap();

        let request = view.submit(" summarize ").unwrap();
        assert_eq!(request.query, "summarize");
        assert_eq!(request.file_id_list, vec!["1", "3"]);
        assert_eq!(request.ticket_id.as_deref(), Some("A"));
        assert_eq!(request.user_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_successful_reply() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        stream_reply(&mut view, &["Hel", "lo, wor", "ld"]);
        assert!(view.transcript().is_streaming());

        view.apply(ReplyEvent::Finished);
        let last = view.transcript().last().unwrap();
        assert_eq!(last.content, "Hello, world");
        assert_eq!(last.sender, Sender::System);
        assert!(!last.streaming);
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_transport_failure_creates_no_stream_message() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        view.apply(ReplyEvent::Failed {
            reason: "server returned status 500".into(),
            phase: FailurePhase::Transport,
        });

        let messages = view.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].is_error);
        assert_eq!(messages[2].content, "An error occurred: server returned status 500");
        assert!(!view.transcript().is_streaming());
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        stream_reply(&mut view, &["partial"]);
        view.apply(ReplyEvent::Failed {
            reason: "reset".into(),
            phase: FailurePhase::MidStream,
        });

        let messages = view.transcript().messages();
        assert_eq!(messages[2].content, "partial");
        assert!(!messages[2].streaming);
        assert_eq!(messages[3].content, "An error occurred: reset");
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        stream_reply(&mut view, &["so far"]);
        view.apply(ReplyEvent::Cancelled);

        assert_eq!(view.transcript().last().unwrap().content, "so far");
        assert!(!view.transcript().is_streaming());
        assert!(view.submit("again").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cross_folder_notice_expires() {
        let (mut view, _rx) = view();
        view.set_files(vec![file("1", "A"), file("2", "B")]);
        view.toggle_file(&file("1", "A")).unwrap();

        assert!(view.toggle_file(&file("2", "B")).is_err());
        assert_eq!(view.selection().file_ids(), vec!["1"]);
        assert_eq!(
            view.notice().unwrap().text,
            "You can only select files from the same folder."
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        view.tick();
        assert!(view.notice().is_some());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(view.tick());
        assert!(view.notice().is_none());
    }

    #[tokio::test]
    async fn test_set_files_prunes_state() {
        let (mut view, _rx) = view();
        view.set_files(vec![file("1", "A"), file("2", "A/x")]);
        view.toggle_file(&file("2", "A/x")).unwrap();
        assert!(view.toggle_folder("A"));
        assert!(view.toggle_folder("A/x"));

        view.set_files(vec![file("1", "A")]);
        assert!(view.selection().is_empty());
        assert!(view.is_open("A"));
        assert!(!view.is_open("A/x"));
        assert_eq!(view.index().folder_paths(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_toggle_folder() {
        let (mut view, _rx) = view();
        assert!(view.toggle_folder("A"));
        assert!(!view.toggle_folder("A"));
        assert!(!view.is_open("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_history_is_not_disturbed() {
        let (mut view, mut rx) = view();
        view.submit("hi").unwrap();
        view.apply(ReplyEvent::Opened);
        view.set_extent(100, 20);
        view.scroll_by(80);
        view.scroll_by(-40);

        view.apply(ReplyEvent::Delta("more".into()));
        let tick = rx.recv().await.unwrap();
        view.on_idle(tick);
        view.apply(ReplyEvent::Delta("and more".into()));
        view.set_extent(110, 20);

        while view.tick() {}
        assert_eq!(view.viewport().offset(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_again_after_returning_to_bottom() {
        let (mut view, mut rx) = view();
        view.submit("hi").unwrap();
        view.apply(ReplyEvent::Opened);
        view.set_extent(100, 20);
        view.scroll_by(-50);
        view.scroll_by(80);

        // gesture still active: no movement
        view.apply(ReplyEvent::Delta("x".into()));
        view.set_extent(130, 20);
        assert!(!view.viewport().is_animating());

        let tick = rx.recv().await.unwrap();
        view.on_idle(tick);
        assert!(view.viewport().is_animating());
        while view.tick() {}
        assert_eq!(view.viewport().metrics().distance_from_bottom(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_idle_timer() {
        let (mut view, mut rx) = view();
        view.set_extent(100, 20);
        view.scroll_by(10);
        view.teardown();

        let waited = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(waited.is_err());
        assert_eq!(view.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_push_info_waits_for_reply() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        assert!(!view.push_info("Available commands"));

        view.apply(ReplyEvent::Finished);
        assert!(view.push_info("Available commands"));
        let last = view.transcript().last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.content, "Available commands");
    }

    #[tokio::test]
    async fn test_custom_welcome_survives_clear() {
        let (view, _rx) = view();
        let mut view = view.with_welcome("Ask about your documents.");
        assert_eq!(view.transcript().messages()[0].content, "Ask about your documents.");

        view.submit("hi").unwrap();
        view.apply(ReplyEvent::Finished);
        view.clear_transcript();
        assert_eq!(view.transcript().len(), 1);
        assert_eq!(view.transcript().messages()[0].content, "Ask about your documents.");
    }

    #[tokio::test]
    async fn test_clear_refused_while_busy() {
        let (mut view, _rx) = view();
        view.submit("hi").unwrap();
        assert!(!view.clear_transcript());
        view.apply(ReplyEvent::Finished);
        assert!(view.clear_transcript());
        assert_eq!(view.transcript().len(), 1);
    }
}
