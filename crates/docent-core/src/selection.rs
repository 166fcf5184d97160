//! Selection policy: which files scope the next query

use docent_api::FileRecord;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::folder::placement;

/// Why a selection change was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The file lives outside the folder the selection is scoped to
    #[error("You can only select files from the same folder.")]
    CrossFolder { active: String, attempted: String },
}

/// Outcome of an accepted toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Files chosen as query scope, all from a single folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    file_ids: BTreeSet<String>,
    active_folder: Option<String>,
}

impl Selection {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids, in stable order
    pub fn file_ids(&self) -> Vec<String> {
        self.file_ids.iter().cloned().collect()
    }

    /// Folder every selected file belongs to
    pub fn active_folder(&self) -> Option<&str> {
        self.active_folder.as_deref()
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.file_ids.contains(file_id)
    }

    pub fn len(&self) -> usize {
        self.file_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_ids.is_empty()
    }

    /// Add or remove `file`.
    ///
    /// Adding a file from a different folder than the active one is refused
    /// and leaves the selection untouched.
    pub fn toggle(&mut self, file: &FileRecord) -> Result<Toggled, SelectionError> {
        if self.file_ids.remove(&file.file_id) {
            if self.file_ids.is_empty() {
                self.active_folder = None;
            }
            return Ok(Toggled::Removed);
        }

        let folder = placement(&file.folder_path);
        match self.active_folder.as_deref() {
            Some(active) if !self.file_ids.is_empty() && active != folder => {
                Err(SelectionError::CrossFolder {
                    active: active.to_string(),
                    attempted: folder.to_string(),
                })
            }
            _ => {
                if self.file_ids.is_empty() {
                    self.active_folder = Some(folder.to_string());
                }
                self.file_ids.insert(file.file_id.clone());
                Ok(Toggled::Added)
            }
        }
    }

    /// Drop ids that no longer exist in `files`
    pub fn retain_existing(&mut self, files: &[FileRecord]) {
        let before = self.file_ids.len();
        self.file_ids
            .retain(|id| files.iter().any(|f| &f.file_id == id));
        if self.file_ids.len() != before {
            tracing::debug!(
                "dropped {} stale id(s) from selection",
                before - self.file_ids.len()
            );
        }
        if self.file_ids.is_empty() {
            self.active_folder = None;
        }
    }

    /// Clear everything
    pub fn clear(&mut self) {
        self.file_ids.clear();
        self.active_folder = None;
    }
}
