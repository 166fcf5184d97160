//! File panel: folders and the files that can scope a query

use crate::theme::Theme;
use docent_api::FileRecord;
use docent_core::{FolderIndex, FolderNode, Selection};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, StatefulWidget, Widget},
};

/// What a visible row of the panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Folder { path: String, name: String, open: bool, files: usize },
    File(FileRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub entry: TreeEntry,
}

/// Rows currently visible: root-level files first, then folders in index
/// order, descending only into open folders.
pub fn visible_rows(index: &FolderIndex, is_open: impl Fn(&str) -> bool) -> Vec<TreeRow> {
    fn visit(node: &FolderNode, depth: usize, is_open: &dyn Fn(&str) -> bool, rows: &mut Vec<TreeRow>) {
        for child in node.children.values() {
            let open = is_open(child.path.as_str());
            rows.push(TreeRow {
                depth,
                entry: TreeEntry::Folder {
                    path: child.path.clone(),
                    name: child.name.clone(),
                    open,
                    files: child.file_count(),
                },
            });
            if open {
                visit(child, depth + 1, is_open, rows);
                rows.extend(child.files.iter().map(|f| TreeRow {
                    depth: depth + 1,
                    entry: TreeEntry::File(f.clone()),
                }));
            }
        }
    }

    let root = index.root();
    let mut rows: Vec<TreeRow> = root
        .files
        .iter()
        .map(|f| TreeRow {
            depth: 0,
            entry: TreeEntry::File(f.clone()),
        })
        .collect();
    visit(root, 0, &is_open, &mut rows);
    rows
}

/// Cursor over the visible rows
#[derive(Debug, Default)]
pub struct TreeState {
    pub cursor: usize,
}

impl TreeState {
    pub fn up(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.cursor = if self.cursor == 0 { rows - 1 } else { self.cursor - 1 };
    }

    pub fn down(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.cursor = if self.cursor + 1 >= rows { 0 } else { self.cursor + 1 };
    }

    /// Keep the cursor inside the list after it shrank
    pub fn clamp(&mut self, rows: usize) {
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }
}

/// The file panel widget
pub struct FolderTree<'a> {
    rows: &'a [TreeRow],
    selection: &'a Selection,
    theme: &'a Theme,
    focused: bool,
}

impl<'a> FolderTree<'a> {
    pub fn new(rows: &'a [TreeRow], selection: &'a Selection, theme: &'a Theme) -> Self {
        Self {
            rows,
            selection,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn item(&self, row: &TreeRow) -> ListItem<'static> {
        let indent = "  ".repeat(row.depth);
        let line = match &row.entry {
            TreeEntry::Folder { name, open, files, .. } => {
                let icon = if *open { "▾ " } else { "▸ " };
                Line::from(vec![
                    Span::raw(indent),
                    Span::styled(format!("{}{}", icon, name), self.theme.folder_style()),
                    Span::styled(format!(" ({})", files), self.theme.dim_style()),
                ])
            }
            TreeEntry::File(file) => {
                let selected = self.selection.contains(&file.file_id);
                let (mark, style) = if selected {
                    ("[x] ", self.theme.selected_style())
                } else {
                    ("[ ] ", self.theme.base_style())
                };
                let mut spans = vec![
                    Span::raw(indent),
                    Span::styled(mark, style),
                    Span::styled(file.display_name().to_string(), style),
                ];
                if !file.rag_status {
                    spans.push(Span::styled(" (not indexed)", self.theme.dim_style()));
                }
                Line::from(spans)
            }
        };
        ListItem::new(line)
    }
}

impl StatefulWidget for FolderTree<'_> {
    type State = TreeState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let title = match self.selection.active_folder() {
            Some("") => format!(" Files │ {} selected at top level ", self.selection.len()),
            Some(folder) => format!(" Files │ {} selected in {} ", self.selection.len(), folder),
            None => " Files ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        if self.rows.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            buf.set_span(
                inner.x,
                inner.y,
                &Span::styled("No files", self.theme.dim_style()),
                inner.width,
            );
            return;
        }

        let items: Vec<ListItem> = self.rows.iter().map(|r| self.item(r)).collect();
        let mut list = List::new(items)
            .block(block)
            .highlight_spacing(HighlightSpacing::Always);
        if self.focused {
            list = list.highlight_style(self.theme.highlight_style());
        }

        let mut list_state = ListState::default();
        list_state.select(Some(state.cursor.min(self.rows.len() - 1)));
        StatefulWidget::render(list, area, buf, &mut list_state);
    }
}
