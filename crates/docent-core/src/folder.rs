//! Hierarchical folder index built from the flat file list

use docent_api::FileRecord;
use indexmap::IndexMap;

/// A folder in the index, with its sub-folders and the files placed directly in it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    /// Last path component (empty for the root)
    pub name: String,
    /// Full `/`-delimited path (empty for the root)
    pub path: String,
    /// Sub-folders in first-occurrence order
    pub children: IndexMap<String, FolderNode>,
    /// Files whose folder path is exactly this node's path
    pub files: Vec<FileRecord>,
}

impl FolderNode {
    fn new(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            ..Default::default()
        }
    }

    /// Whether this is the root node
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of files in this node and all descendants
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .children
                .values()
                .map(FolderNode::file_count)
                .sum::<usize>()
    }
}

/// Split a folder path into segments.
///
/// Returns `None` for paths that cannot be placed hierarchically: the empty
/// path, and any path with an empty segment (leading, trailing or doubled `/`).
fn path_segments(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// The folder a file is placed in: `path` itself, or the root (`""`) when the
/// path cannot be placed hierarchically
pub fn placement(path: &str) -> &str {
    if path_segments(path).is_some() { path } else { "" }
}

/// Build the folder tree for `files`.
///
/// Deterministic and never patched incrementally: callers rebuild whenever the
/// file list changes. Files with an unplaceable path become root-level entries.
pub fn build(files: &[FileRecord]) -> FolderNode {
    let mut root = FolderNode::default();

    for file in files {
        let Some(segments) = path_segments(&file.folder_path) else {
            if !file.folder_path.is_empty() {
                tracing::debug!(
                    "file {} has malformed folder path {:?}; placing at root",
                    file.file_id,
                    file.folder_path
                );
            }
            root.files.push(file.clone());
            continue;
        };

        let mut node = &mut root;
        for segment in segments {
            let child_path = if node.is_root() {
                segment.to_string()
            } else {
                format!("{}/{}", node.path, segment)
            };
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| FolderNode::new(segment, child_path));
        }
        node.files.push(file.clone());
    }

    root
}

/// Read-only view over a built folder tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderIndex {
    root: FolderNode,
}

impl FolderIndex {
    /// Build the index for `files`
    pub fn build(files: &[FileRecord]) -> Self {
        Self { root: build(files) }
    }

    /// The root node
    pub fn root(&self) -> &FolderNode {
        &self.root
    }

    /// Find the node for a folder path (`""` is the root)
    pub fn find(&self, path: &str) -> Option<&FolderNode> {
        if path.is_empty() {
            return Some(&self.root);
        }
        let mut node = &self.root;
        for segment in path_segments(path)? {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Pre-order walk over every folder below the root, with depth (top level is 0)
    pub fn walk(&self) -> Vec<(usize, &FolderNode)> {
        fn visit<'a>(node: &'a FolderNode, depth: usize, out: &mut Vec<(usize, &'a FolderNode)>) {
            for child in node.children.values() {
                out.push((depth, child));
                visit(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.root, 0, &mut out);
        out
    }

    /// Every folder path, in walk order
    pub fn folder_paths(&self) -> Vec<&str> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node.path.as_str())
            .collect()
    }

    /// Total number of files
    pub fn file_count(&self) -> usize {
        self.root.file_count()
    }

    /// Whether the index holds no files
    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, folder: &str) -> FileRecord {
        FileRecord::new(id, format!("{}.pdf", id), folder)
    }

    #[test]
    fn test_flat_folders() {
        let index = FolderIndex::build(&[file("1", "A"), file("2", "B")]);
        let root = index.root();
        assert!(root.files.is_empty());
        assert_eq!(root.children.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(root.children["A"].files[0].file_id, "1");
        assert_eq!(root.children["B"].files[0].file_id, "2");
    }

    #[test]
    fn test_nested_paths() {
        let index = FolderIndex::build(&[
            file("1", "clients/acme/2024"),
            file("2", "clients/acme"),
            file("3", "clients/globex"),
        ]);

        let acme = index.find("clients/acme").unwrap();
        assert_eq!(acme.name, "acme");
        assert_eq!(acme.files.len(), 1);
        assert_eq!(acme.files[0].file_id, "2");

        let year = index.find("clients/acme/2024").unwrap();
        assert_eq!(year.path, "clients/acme/2024");
        assert_eq!(year.files[0].file_id, "1");

        assert_eq!(index.file_count(), 3);
        assert_eq!(index.find("clients").unwrap().file_count(), 3);
    }

    #[test]
    fn test_child_path_extends_parent() {
        let index = FolderIndex::build(&[file("1", "a/b/c"), file("2", "a/d")]);
        for (_, node) in index.walk() {
            for child in node.children.values() {
                assert_eq!(child.path, format!("{}/{}", node.path, child.name));
            }
        }
        assert_eq!(index.root().path, "");
    }

    #[test]
    fn test_sibling_order_is_first_occurrence() {
        let index = FolderIndex::build(&[
            file("1", "zeta"),
            file("2", "alpha"),
            file("3", "zeta/inner"),
            file("4", "mid"),
        ]);
        assert_eq!(
            index.folder_paths(),
            vec!["zeta", "zeta/inner", "alpha", "mid"]
        );
    }

    #[test]
    fn test_walk_depths() {
        let index = FolderIndex::build(&[file("1", "a/b/c")]);
        let depths: Vec<usize> = index.walk().iter().map(|(d, _)| *d).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_malformed_paths_go_to_root() {
        let index = FolderIndex::build(&[
            file("1", ""),
            file("2", "/leading"),
            file("3", "trailing/"),
            file("4", "double//slash"),
            file("5", "ok"),
        ]);
        let root_ids: Vec<&str> = index
            .root()
            .files
            .iter()
            .map(|f| f.file_id.as_str())
            .collect();
        assert_eq!(root_ids, vec!["1", "2", "3", "4"]);
        assert_eq!(index.folder_paths(), vec!["ok"]);
        assert_eq!(index.file_count(), 5);

        for malformed in ["", "/leading", "trailing/", "double//slash"] {
            assert_eq!(placement(malformed), "");
        }
        assert_eq!(placement("ok"), "ok");
        assert_eq!(placement("a/b"), "a/b");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let files = vec![file("1", "x/y"), file("2", "x"), file("3", "w")];
        let first = FolderIndex::build(&files);
        let second = FolderIndex::build(&files);
        assert_eq!(first, second);
        assert_eq!(first.folder_paths(), second.folder_paths());
    }

    #[test]
    fn test_find_missing() {
        let index = FolderIndex::build(&[file("1", "A")]);
        assert!(index.find("B").is_none());
        assert!(index.find("A/").is_none());
        assert!(index.find("").unwrap().is_root());
    }

    #[test]
    fn test_empty_index() {
        let index = FolderIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.walk().is_empty());
    }
}
