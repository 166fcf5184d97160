//! Chat engine: opens a reply, paces it, and reports progress as events

use async_stream::stream;
use docent_api::{ChatBackend, ChatRequest, FileRecord};
use futures::StreamExt;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::Result,
    pacer::{PaceConfig, Pacer},
    selection::Selection,
};

/// Where a reply failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// The request could not be sent or was answered with a failure status
    Transport,
    /// The body broke off after the reply had opened
    MidStream,
}

/// Progress of one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// The response opened successfully; a streaming message may be created
    Opened,
    /// The next paced slice of text
    Delta(String),
    /// The response completed normally
    Finished,
    /// The reply failed
    Failed { reason: String, phase: FailurePhase },
    /// The reply was cancelled; nothing follows
    Cancelled,
}

impl ReplyEvent {
    /// Check if this event ends the reply
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplyEvent::Finished | ReplyEvent::Failed { .. } | ReplyEvent::Cancelled
        )
    }
}

/// A stream of reply events
pub type ReplyStream = Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>;

/// Drives replies against a backend
pub struct ChatEngine {
    backend: Arc<dyn ChatBackend>,
    pace: PaceConfig,
    user_id: Uuid,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl ChatEngine {
    /// Create an engine
    pub fn new(backend: Arc<dyn ChatBackend>, pace: PaceConfig, user_id: Uuid) -> Self {
        Self {
            backend,
            pace,
            user_id,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn pace(&self) -> PaceConfig {
        self.pace
    }

    /// Build the request for `query` scoped to `selection`
    pub fn request(&self, query: &str, selection: &Selection) -> ChatRequest {
        ChatRequest::new(query, self.user_id).with_scope(
            selection.file_ids(),
            selection.active_folder().map(str::to_string),
        )
    }

    /// Cancel the reply in flight, if any
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Get the cancellation token slot (for callers that must cancel without
    /// borrowing the engine)
    pub fn cancel_handle(&self) -> Arc<Mutex<CancellationToken>> {
        Arc::clone(&self.cancel)
    }

    /// Files available as query scope, failing loudly
    pub async fn try_list_files(&self) -> Result<Vec<FileRecord>> {
        Ok(self.backend.list_files().await?)
    }

    /// Files available as query scope.
    ///
    /// Failures are logged and produce an empty list.
    pub async fn list_files(&self) -> Vec<FileRecord> {
        match self.try_list_files().await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("failed to fetch files: {}", e);
                Vec::new()
            }
        }
    }

    /// Start a reply for `request`.
    ///
    /// `Opened` is only emitted once the backend accepted the request, so a
    /// transport failure produces a single `Failed` event and nothing else.
    pub fn reply(&self, request: ChatRequest) -> ReplyStream {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();

        let backend = Arc::clone(&self.backend);
        let pacer = Pacer::new(self.pace);

        Box::pin(stream! {
            let opened = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = backend.open_chat(&request) => Some(result),
            };

            let response = match opened {
                None => {
                    yield ReplyEvent::Cancelled;
                    return;
                }
                Some(Err(e)) => {
                    tracing::warn!("chat request failed: {}", e);
                    yield ReplyEvent::Failed {
                        reason: e.reason(),
                        phase: FailurePhase::Transport,
                    };
                    return;
                }
                Some(Ok(response)) => response,
            };

            tracing::debug!("reply opened: {:?}", response);
            yield ReplyEvent::Opened;

            let mut paced = pacer.pace(response.into_text_stream());
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    item = paced.next() => Some(item),
                };

                match next {
                    None => {
                        tracing::debug!("reply cancelled");
                        yield ReplyEvent::Cancelled;
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Ok(slice))) => yield ReplyEvent::Delta(slice),
                    Some(Some(Err(e))) => {
                        tracing::warn!("reply broke off: {}", e);
                        yield ReplyEvent::Failed {
                            reason: e.reason(),
                            phase: FailurePhase::MidStream,
                        };
                        return;
                    }
                }
            }

            yield ReplyEvent::Finished;
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use docent_api::{ChatResponse, Error as ApiError};
    use std::time::Duration;

    /// What the mock backend answers with
    pub(crate) enum Script {
        Chunks(Vec<Vec<u8>>),
        ChunksThenError(Vec<Vec<u8>>),
        Json(String),
        Status(u16),
        Hang,
    }

    pub(crate) struct MockBackend {
        script: Mutex<Vec<Script>>,
        pub(crate) files: Vec<FileRecord>,
        pub(crate) requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockBackend {
        pub(crate) fn new(script: Vec<Script>) -> Self {
            Self {
                script: Mutex::new(script),
                files: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn open_chat(&self, request: &ChatRequest) -> docent_api::Result<ChatResponse> {
            self.requests.lock().push(request.clone());
            let next = {
                let mut script = self.script.lock();
                if script.is_empty() {
                    Script::Json("done".into())
                } else {
                    script.remove(0)
                }
            };
            match next {
                Script::Chunks(chunks) => Ok(ChatResponse::Stream(Box::pin(
                    futures::stream::iter(chunks.into_iter().map(Ok)),
                ))),
                Script::ChunksThenError(chunks) => {
                    let mut items: Vec<docent_api::Result<Vec<u8>>> =
                        chunks.into_iter().map(Ok).collect();
                    items.push(Err(ApiError::UnexpectedResponse("connection reset".into())));
                    Ok(ChatResponse::Stream(Box::pin(futures::stream::iter(items))))
                }
                Script::Json(text) => Ok(ChatResponse::Complete(text)),
                Script::Status(code) => Err(ApiError::status(code, "")),
                Script::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn list_files(&self) -> docent_api::Result<Vec<FileRecord>> {
            Ok(self.files.clone())
        }
    }

    pub(crate) fn fast_pace() -> PaceConfig {
        PaceConfig {
            slice_chars: 2,
            delay: Duration::from_millis(1),
        }
    }

    pub(crate) fn engine(script: Vec<Script>) -> ChatEngine {
        ChatEngine::new(Arc::new(MockBackend::new(script)), fast_pace(), Uuid::nil())
    }

    fn chunks(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|p| p.as_bytes().to_vec()).collect()
    }

    fn text_of(events: &[ReplyEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                ReplyEvent::Delta(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_streams_in_order() {
        let engine = engine(vec![Script::Chunks(chunks(&["Hel", "lo, wor", "ld"]))]);
        let request = engine.request("hi", &Selection::new());
        let events: Vec<ReplyEvent> = engine.reply(request).collect().await;

        assert_eq!(events.first(), Some(&ReplyEvent::Opened));
        assert_eq!(events.last(), Some(&ReplyEvent::Finished));
        assert_eq!(text_of(&events), "Hello, world");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_split_multibyte_chunks() {
        let bytes = "naïve €".as_bytes();
        let split: Vec<Vec<u8>> = bytes.iter().map(|b| vec![*b]).collect();
        let engine = engine(vec![Script::Chunks(split)]);
        let events: Vec<ReplyEvent> = engine
            .reply(engine.request("q", &Selection::new()))
            .collect()
            .await;
        assert_eq!(text_of(&events), "naïve €");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_json_fallback_is_paced() {
        let engine = engine(vec![Script::Json("final answer".into())]);
        let events: Vec<ReplyEvent> = engine
            .reply(engine.request("q", &Selection::new()))
            .collect()
            .await;
        let deltas = events
            .iter()
            .filter(|e| matches!(e, ReplyEvent::Delta(_)))
            .count();
        assert_eq!(deltas, 6);
        assert_eq!(text_of(&events), "final answer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_single_event() {
        let engine = engine(vec![Script::Status(500)]);
        let events: Vec<ReplyEvent> = engine
            .reply(engine.request("q", &Selection::new()))
            .collect()
            .await;
        assert_eq!(
            events,
            vec![ReplyEvent::Failed {
                reason: "server returned status 500".into(),
                phase: FailurePhase::Transport,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_failure_after_text() {
        let engine = engine(vec![Script::ChunksThenError(chunks(&["par", "tial"]))]);
        let events: Vec<ReplyEvent> = engine
            .reply(engine.request("q", &Selection::new()))
            .collect()
            .await;
        assert_eq!(text_of(&events), "partial");
        match events.last() {
            Some(ReplyEvent::Failed { phase, .. }) => assert_eq!(*phase, FailurePhase::MidStream),
            other => panic!("unexpected last event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_before_open() {
        let engine = engine(vec![Script::Hang]);
        let mut reply = engine.reply(engine.request("q", &Selection::new()));
        let handle = engine.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.lock().cancel();
        });

        assert_eq!(reply.next().await, Some(ReplyEvent::Cancelled));
        assert_eq!(reply.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mid_reply() {
        let long = "x".repeat(200);
        let engine = engine(vec![Script::Json(long)]);
        let mut reply = engine.reply(engine.request("q", &Selection::new()));

        assert_eq!(reply.next().await, Some(ReplyEvent::Opened));
        assert!(matches!(reply.next().await, Some(ReplyEvent::Delta(_))));
        engine.abort();

        let rest: Vec<ReplyEvent> = reply.collect().await;
        assert_eq!(rest, vec![ReplyEvent::Cancelled]);
    }

    #[tokio::test]
    async fn test_request_carries_selection_scope() {
        let engine = engine(vec![]);
        let mut selection = Selection::new();
        selection
            .toggle(&FileRecord::new("7", "a.pdf", "contracts"))
            .unwrap();

        let request = engine.request("what changed?", &selection);
        assert_eq!(request.file_id_list, vec!["7"]);
        assert_eq!(request.ticket_id.as_deref(), Some("contracts"));
        assert!(request.stream);
        assert_eq!(request.user_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_list_files_passthrough() {
        let mut backend = MockBackend::new(vec![]);
        backend.files = vec![FileRecord::new("1", "a.pdf", "A")];
        let engine = ChatEngine::new(Arc::new(backend), fast_pace(), Uuid::nil());
        assert_eq!(engine.list_files().await.len(), 1);
    }
}
