use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use inkedit_core::{DirEntry, EntryKind};
use thiserror::Error;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier assigned to each explorer node.
/// 檔案總管中每個節點的唯一識別碼。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExplorerNodeId(u64);

impl ExplorerNodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExplorerNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The kind of explorer node.
/// 節點類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerNodeKind {
    Folder,
    File,
}

/// One folder or file in the explorer.
/// 檔案總管中的一個資料夾或檔案。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerNode {
    pub id: ExplorerNodeId,
    pub name: String,
    pub path: PathBuf,
    pub kind: ExplorerNodeKind,
    pub expanded: bool,
    /// `None` until the folder's listing has been loaded.
    pub children: Option<Vec<ExplorerNode>>,
}

impl ExplorerNode {
    fn from_entry(entry: DirEntry) -> Option<Self> {
        let kind = match entry.kind {
            EntryKind::Directory => ExplorerNodeKind::Folder,
            EntryKind::File => ExplorerNodeKind::File,
            EntryKind::Other => return None,
        };
        Some(Self {
            id: ExplorerNodeId::next(),
            name: entry.name,
            path: entry.path,
            kind,
            expanded: false,
            children: None,
        })
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ExplorerNodeKind::Folder
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }
}

/// What the owner of the tree should do after an activation.
/// 節點被啟用後，呼叫端應執行的動作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerIntent {
    OpenFile(PathBuf),
    /// The folder has never been listed; load it and call `attach_children`.
    LoadChildren { id: ExplorerNodeId, path: PathBuf },
    Expanded(ExplorerNodeId),
    Collapsed(ExplorerNodeId),
}

/// A flattened, render-ready view of one visible node.
/// 供繪製使用的扁平化節點列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerRow {
    pub id: ExplorerNodeId,
    pub depth: usize,
    pub name: String,
    pub path: PathBuf,
    pub kind: ExplorerNodeKind,
    pub expanded: bool,
    pub selected: bool,
}

/// Tree-manipulation errors.
/// 檔案總管操作錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("explorer node {0} not found")]
    NodeNotFound(ExplorerNodeId),
    #[error("explorer node {0} is not a folder")]
    NotAFolder(ExplorerNodeId),
}

/// Expand/collapse model of one folder subtree, with lazily loaded children.
/// 資料夾樹的展開/收合模型，子節點延遲載入。
///
/// The tree performs no I/O; listings are supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ExplorerTree {
    root: Option<ExplorerNode>,
    selected: Option<ExplorerNodeId>,
}

impl ExplorerTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole tree with `path` and its listing; the root starts expanded.
    /// 以新的根資料夾取代整棵樹。
    pub fn set_root(
        &mut self,
        path: impl Into<PathBuf>,
        entries: Vec<DirEntry>,
    ) -> ExplorerNodeId {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = ExplorerNodeId::next();
        self.root = Some(ExplorerNode {
            id,
            name,
            path,
            kind: ExplorerNodeKind::Folder,
            expanded: true,
            children: Some(build_children(entries)),
        });
        self.selected = None;
        id
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.selected = None;
    }

    pub fn root(&self) -> Option<&ExplorerNode> {
        self.root.as_ref()
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root.as_ref().map(|root| root.path.as_path())
    }

    pub fn find(&self, id: ExplorerNodeId) -> Option<&ExplorerNode> {
        self.root
            .as_ref()
            .and_then(|root| find_node(root, &|node: &ExplorerNode| node.id == id))
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&ExplorerNode> {
        self.root
            .as_ref()
            .and_then(|root| find_node(root, &|node: &ExplorerNode| node.path == path))
    }

    pub fn selected(&self) -> Option<ExplorerNodeId> {
        self.selected
    }

    /// Selects `id` and resolves the click: files open, folders toggle.
    /// 選取節點；檔案會開啟，資料夾會切換展開狀態。
    pub fn activate(&mut self, id: ExplorerNodeId) -> Result<ExplorerIntent, ExplorerError> {
        let node = self.find(id).ok_or(ExplorerError::NodeNotFound(id))?;
        let file_path = (!node.is_folder()).then(|| node.path.clone());
        self.selected = Some(id);
        match file_path {
            Some(path) => Ok(ExplorerIntent::OpenFile(path)),
            None => self.toggle(id),
        }
    }

    /// Expands or collapses a folder. A folder that was never listed reports
    /// `LoadChildren` and stays collapsed until its children are attached.
    /// 展開或收合資料夾；尚未載入的資料夾會要求呼叫端提供子節點。
    pub fn toggle(&mut self, id: ExplorerNodeId) -> Result<ExplorerIntent, ExplorerError> {
        let node = self.folder_mut(id)?;
        if node.expanded {
            node.expanded = false;
            return Ok(ExplorerIntent::Collapsed(id));
        }
        if node.is_loaded() {
            node.expanded = true;
            Ok(ExplorerIntent::Expanded(id))
        } else {
            Ok(ExplorerIntent::LoadChildren {
                id,
                path: node.path.clone(),
            })
        }
    }

    /// Installs a folder's listing and expands it.
    /// 寫入資料夾的子節點並展開。
    pub fn attach_children(
        &mut self,
        id: ExplorerNodeId,
        entries: Vec<DirEntry>,
    ) -> Result<(), ExplorerError> {
        let node = self.folder_mut(id)?;
        node.children = Some(build_children(entries));
        node.expanded = true;
        Ok(())
    }

    pub fn collapse(&mut self, id: ExplorerNodeId) -> Result<(), ExplorerError> {
        self.folder_mut(id)?.expanded = false;
        Ok(())
    }

    /// Expanded folders below the root, parents before children.
    /// 目前展開中的資料夾（不含根節點）。
    pub fn expanded_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(children) = self.root.as_ref().and_then(|root| root.children.as_ref()) {
            collect_expanded(children, &mut paths);
        }
        paths
    }

    /// Projects the visible part of the tree into rows, root first at depth 0.
    /// 將可見節點投影為扁平列。
    pub fn visible_rows(&self) -> Vec<ExplorerRow> {
        let mut rows = Vec::new();
        if let Some(root) = &self.root {
            push_rows(root, 0, self.selected, &mut rows);
        }
        rows
    }

    fn folder_mut(&mut self, id: ExplorerNodeId) -> Result<&mut ExplorerNode, ExplorerError> {
        let node = self
            .root
            .as_mut()
            .and_then(|root| find_node_mut(root, id))
            .ok_or(ExplorerError::NodeNotFound(id))?;
        if node.is_folder() {
            Ok(node)
        } else {
            Err(ExplorerError::NotAFolder(id))
        }
    }
}

/// Hidden entries (leading `.`) are left out of the explorer.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn build_children(entries: Vec<DirEntry>) -> Vec<ExplorerNode> {
    entries
        .into_iter()
        .filter(|entry| !is_hidden(&entry.name))
        .filter_map(ExplorerNode::from_entry)
        .collect()
}

fn find_node<'a>(
    node: &'a ExplorerNode,
    matches: &dyn Fn(&ExplorerNode) -> bool,
) -> Option<&'a ExplorerNode> {
    if matches(node) {
        return Some(node);
    }
    node.children
        .iter()
        .flatten()
        .find_map(|child| find_node(child, matches))
}

fn find_node_mut(node: &mut ExplorerNode, id: ExplorerNodeId) -> Option<&mut ExplorerNode> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .iter_mut()
        .flatten()
        .find_map(|child| find_node_mut(child, id))
}

fn collect_expanded(nodes: &[ExplorerNode], paths: &mut Vec<PathBuf>) {
    for node in nodes.iter().filter(|node| node.is_folder() && node.expanded) {
        paths.push(node.path.clone());
        if let Some(children) = &node.children {
            collect_expanded(children, paths);
        }
    }
}

fn push_rows(
    node: &ExplorerNode,
    depth: usize,
    selected: Option<ExplorerNodeId>,
    rows: &mut Vec<ExplorerRow>,
) {
    rows.push(ExplorerRow {
        id: node.id,
        depth,
        name: node.name.clone(),
        path: node.path.clone(),
        kind: node.kind,
        expanded: node.expanded,
        selected: selected == Some(node.id),
    });
    if !node.expanded {
        return;
    }
    for child in node.children.iter().flatten() {
        push_rows(child, depth + 1, selected, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, kind: EntryKind) -> DirEntry {
        let path = PathBuf::from(path);
        DirEntry {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            path,
            kind,
        }
    }

    fn sample_tree() -> ExplorerTree {
        let mut tree = ExplorerTree::new();
        tree.set_root(
            "/w",
            vec![
                entry("/w/.git", EntryKind::Directory),
                entry("/w/src", EntryKind::Directory),
                entry("/w/README.md", EntryKind::File),
                entry("/w/socket", EntryKind::Other),
            ],
        );
        tree
    }

    #[test]
    fn set_root_skips_hidden_and_special_entries() {
        let tree = sample_tree();
        let names: Vec<_> = tree.visible_rows().into_iter().map(|row| row.name).collect();
        assert_eq!(names, ["w", "src", "README.md"]);
        assert_eq!(tree.root_path(), Some(Path::new("/w")));
    }

    #[test]
    fn activating_a_file_yields_open_intent() {
        let mut tree = sample_tree();
        let readme = tree.find_by_path(Path::new("/w/README.md")).unwrap().id;
        assert_eq!(
            tree.activate(readme).unwrap(),
            ExplorerIntent::OpenFile(PathBuf::from("/w/README.md"))
        );
        assert_eq!(tree.selected(), Some(readme));
        assert!(tree.visible_rows().iter().any(|row| row.id == readme && row.selected));
        assert_eq!(tree.toggle(readme), Err(ExplorerError::NotAFolder(readme)));
    }

    #[test]
    fn folders_load_once_then_toggle() {
        let mut tree = sample_tree();
        let src = tree.find_by_path(Path::new("/w/src")).unwrap().id;

        assert_eq!(
            tree.activate(src).unwrap(),
            ExplorerIntent::LoadChildren {
                id: src,
                path: PathBuf::from("/w/src")
            }
        );
        assert!(!tree.find(src).unwrap().expanded);

        tree.attach_children(src, vec![entry("/w/src/main.rs", EntryKind::File)])
            .unwrap();
        let rows = tree.visible_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].name, "main.rs");
        assert_eq!(rows[2].depth, 2);
        assert_eq!(tree.expanded_paths(), vec![PathBuf::from("/w/src")]);

        assert_eq!(tree.toggle(src).unwrap(), ExplorerIntent::Collapsed(src));
        assert_eq!(tree.visible_rows().len(), 3);
        assert_eq!(tree.toggle(src).unwrap(), ExplorerIntent::Expanded(src));
        assert_eq!(tree.visible_rows().len(), 4);
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let mut tree = sample_tree();
        let stale = tree.root().unwrap().id;
        tree.clear();
        assert_eq!(tree.activate(stale), Err(ExplorerError::NodeNotFound(stale)));
        assert!(tree.visible_rows().is_empty());
    }
}
