//! Widgets for the chat view

pub mod folder_tree;
pub mod input_box;
pub mod markdown;
pub mod message_list;
pub mod spinner;

pub use folder_tree::{FolderTree, TreeEntry, TreeRow, TreeState};
pub use input_box::InputBox;
pub use message_list::MessageList;
pub use spinner::Spinner;
