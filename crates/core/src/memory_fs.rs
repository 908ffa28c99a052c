use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::host::{sort_entries, DirEntry, EntryKind, HostError, HostFs};

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Directory,
}

/// 記憶體內的檔案系統，供測試與嵌入使用。 / In-memory [`HostFs`] for tests and embedding.
///
/// Besides the file tree it records every write, counts reads per path, can
/// inject failures, and can yield to the executor on each I/O call so that
/// interleavings between overlapping operations become observable.
#[derive(Debug, Default)]
pub struct MemoryHostFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    yield_on_io: Cell<bool>,
    failing_reads: RefCell<HashSet<PathBuf>>,
    failing_listings: RefCell<HashSet<PathBuf>>,
    fail_writes: Cell<bool>,
    open_file_answers: RefCell<VecDeque<Option<PathBuf>>>,
    open_folder_answers: RefCell<VecDeque<Option<PathBuf>>>,
    save_file_answers: RefCell<VecDeque<Option<PathBuf>>>,
    save_dialog_defaults: RefCell<Vec<Option<String>>>,
    write_log: RefCell<Vec<(PathBuf, String)>>,
    read_counts: RefCell<HashMap<PathBuf, usize>>,
    writes_in_flight: Cell<usize>,
    max_concurrent_writes: Cell<usize>,
}

impl MemoryHostFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增檔案並自動建立上層目錄。 / Adds a file, creating missing parent directories.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into();
        self.add_parents(&path);
        self.nodes
            .borrow_mut()
            .insert(path, Node::File(content.into()));
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.add_parents(&path);
        self.nodes.borrow_mut().insert(path, Node::Directory);
    }

    /// 移除路徑及其下所有項目。 / Removes `path` and everything beneath it.
    pub fn remove(&self, path: &Path) {
        self.nodes
            .borrow_mut()
            .retain(|candidate, _| !candidate.starts_with(path));
    }

    pub fn file_contents(&self, path: &Path) -> Option<String> {
        match self.nodes.borrow().get(path) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// 每次 I/O 時讓出執行權。 / Yields to the executor inside every I/O call.
    pub fn set_yield_on_io(&self, enabled: bool) {
        self.yield_on_io.set(enabled);
    }

    pub fn fail_read(&self, path: impl Into<PathBuf>) {
        self.failing_reads.borrow_mut().insert(path.into());
    }

    pub fn fail_listing(&self, path: impl Into<PathBuf>) {
        self.failing_listings.borrow_mut().insert(path.into());
    }

    pub fn set_fail_writes(&self, enabled: bool) {
        self.fail_writes.set(enabled);
    }

    pub fn queue_open_file(&self, answer: Option<PathBuf>) {
        self.open_file_answers.borrow_mut().push_back(answer);
    }

    pub fn queue_open_folder(&self, answer: Option<PathBuf>) {
        self.open_folder_answers.borrow_mut().push_back(answer);
    }

    pub fn queue_save_file(&self, answer: Option<PathBuf>) {
        self.save_file_answers.borrow_mut().push_back(answer);
    }

    /// 每次儲存對話框收到的預設檔名。 / Default names passed to each save dialog, in call order.
    pub fn save_dialog_defaults(&self) -> Vec<Option<String>> {
        self.save_dialog_defaults.borrow().clone()
    }

    /// 依完成順序記錄的寫入。 / Completed writes in completion order.
    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.write_log.borrow().clone()
    }

    pub fn writes_to(&self, path: &Path) -> Vec<String> {
        self.write_log
            .borrow()
            .iter()
            .filter(|(written, _)| written == path)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn read_count(&self, path: &Path) -> usize {
        self.read_counts.borrow().get(path).copied().unwrap_or(0)
    }

    /// 同時進行中的寫入數量最大值。 / Highest number of writes observed in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_concurrent_writes.get()
    }

    fn add_parents(&self, path: &Path) {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Directory);
        }
    }

    async fn io_point(&self) {
        if self.yield_on_io.get() {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait(?Send)]
impl HostFs for MemoryHostFs {
    async fn open_file_dialog(&self) -> Result<Option<PathBuf>, HostError> {
        self.io_point().await;
        Ok(self.open_file_answers.borrow_mut().pop_front().flatten())
    }

    async fn open_folder_dialog(&self) -> Result<Option<PathBuf>, HostError> {
        self.io_point().await;
        Ok(self.open_folder_answers.borrow_mut().pop_front().flatten())
    }

    async fn save_file_dialog(
        &self,
        default_name: Option<&str>,
    ) -> Result<Option<PathBuf>, HostError> {
        self.save_dialog_defaults
            .borrow_mut()
            .push(default_name.map(str::to_string));
        self.io_point().await;
        Ok(self.save_file_answers.borrow_mut().pop_front().flatten())
    }

    async fn read_file(&self, path: &Path) -> Result<String, HostError> {
        *self
            .read_counts
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        self.io_point().await;
        if self.failing_reads.borrow().contains(path) {
            return Err(HostError::Io {
                path: path.to_path_buf(),
                message: "injected read failure".into(),
            });
        }
        match self.nodes.borrow().get(path) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Directory) => Err(HostError::Io {
                path: path.to_path_buf(),
                message: "is a directory".into(),
            }),
            None => Err(HostError::NotFound(path.to_path_buf())),
        }
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        let in_flight = self.writes_in_flight.get() + 1;
        self.writes_in_flight.set(in_flight);
        self.max_concurrent_writes
            .set(self.max_concurrent_writes.get().max(in_flight));
        self.io_point().await;
        self.writes_in_flight.set(self.writes_in_flight.get() - 1);

        if self.fail_writes.get() {
            return Err(HostError::Io {
                path: path.to_path_buf(),
                message: "injected write failure".into(),
            });
        }
        self.add_file(path, content);
        self.write_log
            .borrow_mut()
            .push((path.to_path_buf(), content.to_string()));
        Ok(())
    }

    async fn read_directory(&self, path: &Path) -> Result<Vec<DirEntry>, HostError> {
        self.io_point().await;
        if self.failing_listings.borrow().contains(path) {
            return Err(HostError::Io {
                path: path.to_path_buf(),
                message: "injected listing failure".into(),
            });
        }
        let nodes = self.nodes.borrow();
        match nodes.get(path) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => {
                return Err(HostError::Io {
                    path: path.to_path_buf(),
                    message: "not a directory".into(),
                })
            }
            None => return Err(HostError::NotFound(path.to_path_buf())),
        }
        let mut entries: Vec<DirEntry> = nodes
            .iter()
            .filter(|(candidate, _)| candidate.parent() == Some(path))
            .map(|(candidate, node)| DirEntry {
                name: candidate
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: candidate.clone(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Directory => EntryKind::Directory,
                },
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        self.io_point().await;
        self.nodes.borrow().get(path).map(|node| match node {
            Node::File(_) => EntryKind::File,
            Node::Directory => EntryKind::Directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn files_create_parent_directories() {
        let host = MemoryHostFs::new();
        host.add_file("/w/src/main.rs", "fn main() {}");

        assert_eq!(host.entry_kind(Path::new("/w")).await, Some(EntryKind::Directory));
        assert_eq!(host.entry_kind(Path::new("/w/src")).await, Some(EntryKind::Directory));
        assert_eq!(
            host.read_file(Path::new("/w/src/main.rs")).await.unwrap(),
            "fn main() {}"
        );
        assert_eq!(host.read_count(Path::new("/w/src/main.rs")), 1);
    }

    #[tokio::test]
    async fn listing_returns_direct_children_sorted() {
        let host = MemoryHostFs::new();
        host.add_file("/w/b.txt", "");
        host.add_file("/w/a.txt", "");
        host.add_file("/w/lib/deep.rs", "");

        let entries = host.read_directory(Path::new("/w")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["lib", "a.txt", "b.txt"]);
        assert!(host.read_directory(Path::new("/nope")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let host = MemoryHostFs::new();
        host.add_file("/w/a.txt", "x");
        host.fail_read("/w/a.txt");
        host.fail_listing("/w");
        host.set_fail_writes(true);

        assert!(host.read_file(Path::new("/w/a.txt")).await.is_err());
        assert!(host.read_directory(Path::new("/w")).await.is_err());
        assert!(host.write_file(Path::new("/w/b.txt"), "y").await.is_err());
        assert!(host.writes().is_empty());
    }

    #[tokio::test]
    async fn dialogs_pop_queued_answers() {
        let host = MemoryHostFs::new();
        host.queue_save_file(Some(PathBuf::from("/w/out.txt")));

        let answer = host.save_file_dialog(Some("Untitled-1")).await.unwrap();
        assert_eq!(answer, Some(PathBuf::from("/w/out.txt")));
        assert_eq!(host.save_file_dialog(None).await.unwrap(), None);
        assert_eq!(
            host.save_dialog_defaults(),
            vec![Some("Untitled-1".to_string()), None]
        );
    }

    #[tokio::test]
    async fn remove_drops_subtree() {
        let host = MemoryHostFs::new();
        host.add_file("/w/dir/a.txt", "");
        host.remove(Path::new("/w/dir"));
        assert!(!host.exists(Path::new("/w/dir/a.txt")).await);
        assert!(host.exists(Path::new("/w")).await);
    }
}
