//! docent-core: Streaming transcript engine
//!
//! This crate owns the state behind a chat view: the transcript, the folder
//! index and selection that scope a query, the paced renderer that reveals a
//! streamed reply, and the scroll state machine that decides whether the view
//! follows new content.

pub mod engine;
pub mod error;
pub mod folder;
pub mod pacer;
pub mod scroll;
pub mod selection;
pub mod transcript;
pub mod view;

pub use engine::{ChatEngine, FailurePhase, ReplyEvent, ReplyStream};
pub use error::{Error, Result};
pub use folder::{FolderIndex, FolderNode};
pub use pacer::{PaceConfig, Pacer};
pub use scroll::{FollowMode, IdleTick, ScrollCommand, ScrollConfig, ScrollMetrics, ScrollTracker, Viewport};
pub use selection::{Selection, SelectionError, Toggled};
pub use transcript::{Message, MessageId, Sender, Transcript};
pub use view::{ChatView, Notice, SubmitError, WELCOME};
