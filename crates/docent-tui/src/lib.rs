//! docent-tui: Terminal widgets for the docent chat view
//!
//! Rendering only. State lives in `docent-core`; these widgets borrow it and
//! draw it with ratatui.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
