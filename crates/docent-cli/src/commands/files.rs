//! /files command and the text tree shared with `--files`

use super::CommandResult;
use crate::utils::truncate_chars;
use docent_core::{ChatView, FolderIndex, FolderNode, Selection};
use std::fmt::Write;

const NAME_WIDTH: usize = 60;

pub struct FilesCommand;

impl FilesCommand {
    pub fn execute(view: &ChatView) -> CommandResult {
        CommandResult::Message(tree_text(view.index(), view.selection()))
    }
}

/// Render the folder index as an indented text tree.
///
/// Root-level files come first, then folders; inside a folder subfolders
/// precede files. Selected files carry `[x]`.
pub fn tree_text(index: &FolderIndex, selection: &Selection) -> String {
    if index.is_empty() {
        return "No files.".to_string();
    }

    fn file_line(out: &mut String, depth: usize, file: &docent_api::FileRecord, selection: &Selection) {
        let mark = if selection.contains(&file.file_id) { "[x]" } else { "[ ]" };
        let _ = write!(
            out,
            "\n{}{} {}",
            "  ".repeat(depth + 1),
            mark,
            truncate_chars(file.display_name(), NAME_WIDTH)
        );
        if !file.rag_status {
            out.push_str(" (not indexed)");
        }
        let _ = write!(out, "  #{}", file.file_id);
    }

    fn visit(out: &mut String, node: &FolderNode, depth: usize, selection: &Selection) {
        for child in node.children.values() {
            let _ = write!(
                out,
                "\n{}{}/ ({})",
                "  ".repeat(depth + 1),
                child.name,
                child.file_count()
            );
            visit(out, child, depth + 1, selection);
            for file in &child.files {
                file_line(out, depth + 1, file, selection);
            }
        }
    }

    let mut out = format!("Files ({}):", index.file_count());
    for file in &index.root().files {
        file_line(&mut out, 0, file, selection);
    }
    visit(&mut out, index.root(), 0, selection);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_api::FileRecord;

    fn file(id: &str, name: &str, folder: &str, indexed: bool) -> FileRecord {
        FileRecord {
            rag_status: indexed,
            ..FileRecord::new(id, name, folder)
        }
    }

    #[test]
    fn test_empty_index() {
        assert_eq!(tree_text(&FolderIndex::default(), &Selection::new()), "No files.");
    }

    #[test]
    fn test_tree_layout() {
        let a = file("a1", "terms.pdf", "Legal", true);
        let files = vec![
            file("r1", "readme.md", "", true),
            a.clone(),
            file("c1", "nda.pdf", "Legal/Contracts", false),
        ];
        let index = FolderIndex::build(&files);
        let mut selection = Selection::new();
        selection.toggle(&a).unwrap();

        let text = tree_text(&index, &selection);
        assert_eq!(
            text,
            "Files (3):\n  [ ] readme.md  #r1\n  Legal/ (2)\n    Contracts/ (1)\n      [ ] nda.pdf (not indexed)  #c1\n    [x] terms.pdf  #a1"
        );
    }
}
