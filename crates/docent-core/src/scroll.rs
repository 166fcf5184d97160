//! Scroll reconciliation: decide whether new content may move the viewport
//!
//! The viewport follows new content only while the user has left it near the
//! bottom and is not in the middle of a scroll gesture. Gestures are debounced
//! with an [`IdleTimer`] whose ticks arrive on a channel the host polls.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Whether the viewport should stay pinned to the newest content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    #[default]
    Following,
    Manual,
}

/// Scroll geometry in terminal rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub content_height: usize,
    pub offset: usize,
    pub viewport_height: usize,
}

impl ScrollMetrics {
    /// Rows between the bottom of the viewport and the end of the content
    pub fn distance_from_bottom(&self) -> usize {
        self.content_height
            .saturating_sub(self.offset)
            .saturating_sub(self.viewport_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Rows from the bottom that still count as "at the bottom"
    pub threshold: usize,
    /// Quiet period after the last scroll event before the gesture ends
    pub idle: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            idle: Duration::from_millis(500),
        }
    }
}

/// Fired by the idle timer; carries the generation it was armed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTick(pub u64);

/// Viewport movement requested by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    ToBottom { smooth: bool },
}

/// Restartable one-shot timer that reports through a channel.
///
/// Every restart or cancel bumps the generation, so a tick that was already
/// queued by a superseded timer is recognizably stale.
#[derive(Debug)]
pub struct IdleTimer {
    tx: mpsc::UnboundedSender<IdleTick>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl IdleTimer {
    pub fn new(tx: mpsc::UnboundedSender<IdleTick>) -> Self {
        Self {
            tx,
            generation: 0,
            handle: None,
        }
    }

    /// Abort any pending tick and arm a new one `delay` from now
    pub fn restart(&mut self, delay: Duration) {
        self.cancel();
        let generation = self.generation;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(IdleTick(generation));
        }));
    }

    /// Abort the pending tick, if any
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Accept `tick` if it belongs to the armed timer
    fn fire(&mut self, tick: IdleTick) -> bool {
        if self.handle.is_none() || tick.0 != self.generation {
            return false;
        }
        self.handle = None;
        true
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Follow/manual state machine for one transcript view
#[derive(Debug)]
pub struct ScrollTracker {
    config: ScrollConfig,
    mode: FollowMode,
    user_active: bool,
    timer: IdleTimer,
}

impl ScrollTracker {
    /// Create a tracker and the receiver its idle ticks arrive on
    pub fn new(config: ScrollConfig) -> (Self, mpsc::UnboundedReceiver<IdleTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Self {
            config,
            mode: FollowMode::Following,
            user_active: false,
            timer: IdleTimer::new(tx),
        };
        (tracker, rx)
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn is_following(&self) -> bool {
        self.mode == FollowMode::Following
    }

    /// Whether a scroll gesture is in progress or inside the debounce window
    pub fn is_user_active(&self) -> bool {
        self.user_active
    }

    pub fn config(&self) -> ScrollConfig {
        self.config
    }

    /// Handle a user scroll event.
    ///
    /// Must be called from within a tokio runtime (it arms the idle timer).
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        self.mode = if metrics.distance_from_bottom() <= self.config.threshold {
            FollowMode::Following
        } else {
            FollowMode::Manual
        };
        self.user_active = true;
        self.timer.restart(self.config.idle);
        tracing::trace!("scroll {:?} -> {:?}", metrics, self.mode);
    }

    /// Handle an idle tick. Stale ticks are ignored.
    ///
    /// Ending a gesture while following replays the content-update check
    /// that was suppressed during it.
    pub fn on_idle(&mut self, tick: IdleTick) -> Option<ScrollCommand> {
        if !self.timer.fire(tick) {
            tracing::trace!("ignoring stale idle tick {:?}", tick);
            return None;
        }
        self.user_active = false;
        self.on_content_update()
    }

    /// Decide whether new content moves the viewport
    pub fn on_content_update(&self) -> Option<ScrollCommand> {
        (self.is_following() && !self.user_active).then_some(ScrollCommand::ToBottom { smooth: true })
    }

    /// A new query was submitted: follow again and jump to the bottom
    pub fn on_submit(&mut self) -> ScrollCommand {
        self.timer.cancel();
        self.mode = FollowMode::Following;
        self.user_active = false;
        ScrollCommand::ToBottom { smooth: false }
    }

    /// Cancel the pending idle timer; nothing fires after this
    pub fn teardown(&mut self) {
        self.timer.cancel();
    }
}

/// Terminal scroll model: extent, offset and an optional smooth move to the
/// bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    content_height: usize,
    viewport_height: usize,
    offset: usize,
    animating: bool,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            content_height: self.content_height,
            offset: self.offset,
            viewport_height: self.viewport_height,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    fn max_offset(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Update the content and viewport heights, clamping the offset
    pub fn set_extent(&mut self, content_height: usize, viewport_height: usize) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Apply a user scroll gesture of `delta` rows (negative is up).
    ///
    /// Cancels any programmatic animation.
    pub fn scroll_by(&mut self, delta: isize) -> ScrollMetrics {
        self.animating = false;
        self.offset = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
        self.metrics()
    }

    /// Carry out a tracker command
    pub fn apply(&mut self, command: ScrollCommand) {
        match command {
            ScrollCommand::ToBottom { smooth: false } => {
                self.animating = false;
                self.offset = self.max_offset();
            }
            // the extent may still grow before the next tick
            ScrollCommand::ToBottom { smooth: true } => self.animating = true,
        }
    }

    /// Advance the smooth animation by one frame, halving the remaining
    /// distance. Returns whether the offset changed.
    pub fn tick(&mut self) -> bool {
        if !self.animating {
            return false;
        }
        let remaining = self.max_offset().saturating_sub(self.offset);
        if remaining <= 1 {
            self.offset = self.max_offset();
            self.animating = false;
            return remaining > 0;
        }
        self.offset += remaining.div_ceil(2);
        true
    }
}
