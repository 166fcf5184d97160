//! Slash commands for interactive mode

mod files;

pub use files::{FilesCommand, tree_text};

use docent_core::ChatView;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Clear the transcript back to the greeting
    Clear,
    /// Reload the file list from the backend
    Refresh,
    /// Show a message to the user (not sent upstream)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, view: &ChatView) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let command = rest
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "files" | "f" => FilesCommand::execute(view),

        "refresh" | "r" => CommandResult::Refresh,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /files, /f           Show the file tree and the current selection
  /refresh, /r         Reload the file list
  /clear, /c           Clear the conversation
  /quit, /exit, /q     Exit docent

Queries are scoped to the selected files. Files can only be selected
from one folder at a time."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::ScrollConfig;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_parse_commands() {
        let (view, _rx) = ChatView::new(ScrollConfig::default(), Uuid::nil());

        assert_eq!(execute_command("hello", &view), None);
        assert_eq!(execute_command("/clear", &view), Some(CommandResult::Clear));
        assert_eq!(execute_command("  /Q  ", &view), Some(CommandResult::Exit));
        assert_eq!(execute_command("/refresh now", &view), Some(CommandResult::Refresh));
        assert_eq!(
            execute_command("/files", &view),
            Some(CommandResult::Message("No files.".to_string()))
        );
        assert_eq!(
            execute_command("/frobnicate x", &view),
            Some(CommandResult::Unknown("frobnicate".to_string()))
        );
    }

    #[tokio::test]
    async fn test_help_lists_every_command() {
        let (view, _rx) = ChatView::new(ScrollConfig::default(), Uuid::nil());
        let Some(CommandResult::Message(help)) = execute_command("/help", &view) else {
            panic!("expected help text");
        };
        for name in ["/files", "/refresh", "/clear", "/quit"] {
            assert!(help.contains(name), "missing {}", name);
        }
    }
}
