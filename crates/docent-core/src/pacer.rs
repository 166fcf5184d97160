//! Paced renderer: reveals streamed text in small time-sliced increments

use async_stream::stream;
use docent_api::{Error as ApiError, TextStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

/// Paced slices of reply text; an `Err` ends the stream
pub type PacedStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Rendering cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaceConfig {
    /// Characters per revealed slice (at least 1)
    pub slice_chars: usize,
    /// Pause after each slice; zero only yields to the scheduler
    pub delay: Duration,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            slice_chars: 2,
            delay: Duration::from_millis(4),
        }
    }
}

/// Splits text into slices and suspends between them
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    config: PaceConfig,
}

impl Pacer {
    pub fn new(config: PaceConfig) -> Self {
        Self {
            config: PaceConfig {
                slice_chars: config.slice_chars.max(1),
                ..config
            },
        }
    }

    pub fn config(&self) -> PaceConfig {
        self.config
    }

    /// Split `text` on character boundaries into slices of at most
    /// `slice_chars` characters
    pub fn slices<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let n = self.config.slice_chars;
        let mut out = Vec::with_capacity(text.len() / n + 1);
        let mut start = 0;
        for (count, (idx, _)) in text.char_indices().enumerate() {
            if count > 0 && count % n == 0 {
                out.push(&text[start..idx]);
                start = idx;
            }
        }
        if start < text.len() {
            out.push(&text[start..]);
        }
        out
    }

    /// Suspend between two slices
    pub async fn pause(&self) {
        if self.config.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.delay).await;
        }
    }

    /// Pace a text stream.
    ///
    /// Slices are yielded one at a time, each followed by a pause. Upstream
    /// increments keep being read during pauses, so slow rendering never
    /// stalls the transport. An upstream error is yielded only after every
    /// slice received before it.
    pub fn pace(self, mut text: TextStream) -> PacedStream {
        Box::pin(stream! {
            let mut pending: VecDeque<String> = VecDeque::new();
            let mut upstream_done = false;
            let mut failure: Option<ApiError> = None;

            loop {
                let Some(slice) = pending.pop_front() else {
                    if upstream_done {
                        break;
                    }
                    match text.next().await {
                        Some(Ok(increment)) => {
                            pending.extend(self.slices(&increment).into_iter().map(str::to_string));
                        }
                        Some(Err(e)) => {
                            failure = Some(e);
                            upstream_done = true;
                        }
                        None => upstream_done = true,
                    }
                    continue;
                };

                yield Ok(slice);

                let pause = self.pause();
                tokio::pin!(pause);
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut pause => break,
                        item = text.next(), if !upstream_done => match item {
                            Some(Ok(increment)) => {
                                pending.extend(self.slices(&increment).into_iter().map(str::to_string));
                            }
                            Some(Err(e)) => {
                                failure = Some(e);
                                upstream_done = true;
                            }
                            None => upstream_done = true,
                        },
                    }
                }
            }

            if let Some(e) = failure {
                yield Err(e);
            }
        })
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PaceConfig::default())
    }
}
