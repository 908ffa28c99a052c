use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use inkedit_core::{Document, DocumentId, EntryKind, HostError, HostFs};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The durable record of folder, tabs and active file.
/// 工作階段紀錄：資料夾、分頁順序與使用中的檔案。
///
/// Always written and read as a whole; no partial-field updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, with = "crate::serde_path::option")]
    pub last_opened_folder: Option<PathBuf>,
    #[serde(default, with = "crate::serde_path::vec")]
    pub opened_file_paths: Vec<PathBuf>,
    #[serde(default, with = "crate::serde_path::option")]
    pub active_file_path: Option<PathBuf>,
}

impl SessionRecord {
    /// Snapshots the workspace: every saved document in tab order plus the active one.
    /// 擷取目前工作區；未儲存（無路徑）的文件不列入。
    pub fn snapshot(folder: Option<&Path>, documents: &[Document]) -> Self {
        Self {
            last_opened_folder: folder.map(Path::to_path_buf),
            opened_file_paths: documents
                .iter()
                .filter_map(|doc| doc.path().map(Path::to_path_buf))
                .collect(),
            active_file_path: documents
                .iter()
                .find(|doc| doc.is_active())
                .and_then(|doc| doc.path().map(Path::to_path_buf)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_opened_folder.is_none()
            && self.opened_file_paths.is_empty()
            && self.active_file_path.is_none()
    }
}

/// Result of checking a record against the live file system.
/// 以實際檔案系統驗證紀錄後的結果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionValidation {
    pub is_valid: bool,
    /// The persisted folder, present only when it is still a directory.
    pub folder: Option<PathBuf>,
    pub valid_files: Vec<PathBuf>,
    /// Cleared when the persisted active file failed validation.
    pub active_file: Option<PathBuf>,
}

impl SessionValidation {
    pub fn folder_exists(&self) -> bool {
        self.folder.is_some()
    }
}

/// What a restore produced.
/// 還原作業的結果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// `true` iff at least one document was created.
    pub restored: bool,
    pub folder_restored: bool,
    pub documents: Vec<DocumentId>,
    /// Validated files whose contents could not be read.
    pub skipped: Vec<PathBuf>,
}

/// How a `persist` call was handled.
/// 寫入要求的處理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// Another write was in flight; this record replaced the pending slot.
    Queued,
}

/// Receiver of restored state, supplied by whoever owns the documents.
/// 接收還原內容的一方（通常是協調器）。
#[async_trait(?Send)]
pub trait RestoreTarget {
    /// Loads `folder` into the explorer; `false` when the listing failed.
    async fn restore_folder(&mut self, folder: &Path) -> bool;

    fn restore_document(&mut self, path: &Path, content: String) -> Option<DocumentId>;

    fn restore_active(&mut self, path: &Path) -> bool;
}

/// Error type for session persistence.
/// 工作階段持久化時可能出現的錯誤。
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Host(#[from] HostError),
    #[error("invalid session payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Loads, validates, restores and persists the session record through [`HostFs`].
/// 透過 [`HostFs`] 載入、驗證、還原與儲存工作階段紀錄。
///
/// Writes are serialized: while one is in flight, later records wait in a
/// single pending slot and only the newest of them is written afterwards.
#[derive(Debug)]
pub struct SessionStore {
    session_path: PathBuf,
    in_flight: Cell<bool>,
    pending: RefCell<Option<SessionRecord>>,
}

impl SessionStore {
    pub fn new(session_path: impl AsRef<Path>) -> Self {
        Self {
            session_path: session_path.as_ref().to_path_buf(),
            in_flight: Cell::new(false),
            pending: RefCell::new(None),
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Reads the record. A missing file returns `Ok(None)`.
    /// 讀取紀錄；檔案不存在時回傳 `Ok(None)`。
    pub async fn load<F>(&self, fs: &F) -> Result<Option<SessionRecord>, SessionError>
    where
        F: HostFs + ?Sized,
    {
        match fs.read_file(&self.session_path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Loads and validates the record. Unreadable or corrupt records count as invalid.
    /// 載入並驗證紀錄；無法讀取或損毀的紀錄視為無效。
    pub async fn validate<F>(&self, fs: &F) -> SessionValidation
    where
        F: HostFs + ?Sized,
    {
        match self.load(fs).await {
            Ok(Some(record)) => validate_record(fs, &record).await,
            Ok(None) => SessionValidation::default(),
            Err(err) => {
                warn!(path = %self.session_path.display(), %err, "ignoring unreadable session");
                SessionValidation::default()
            }
        }
    }

    /// Rebuilds the workspace from the validated record.
    /// 依驗證後的紀錄重建工作區。
    ///
    /// Invalid sessions return an empty outcome with no side effects. Files that
    /// pass validation but fail to read are reported in `skipped`.
    pub async fn restore<F, T>(&self, fs: &F, target: &mut T) -> RestoreOutcome
    where
        F: HostFs + ?Sized,
        T: RestoreTarget + ?Sized,
    {
        let validation = self.validate(fs).await;
        if !validation.is_valid {
            debug!("no valid session to restore");
            return RestoreOutcome::default();
        }

        let mut outcome = RestoreOutcome::default();
        if let Some(folder) = validation.folder.as_deref() {
            outcome.folder_restored = target.restore_folder(folder).await;
        }
        for path in &validation.valid_files {
            match fs.read_file(path).await {
                Ok(content) => {
                    if let Some(id) = target.restore_document(path, content) {
                        outcome.documents.push(id);
                    }
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable session file");
                    outcome.skipped.push(path.clone());
                }
            }
        }
        if let Some(active) = validation.active_file.as_deref() {
            target.restore_active(active);
        }
        outcome.restored = !outcome.documents.is_empty();
        info!(
            documents = outcome.documents.len(),
            folder = outcome.folder_restored,
            "session restored"
        );
        outcome
    }

    /// Writes `record` wholesale, coalescing with any write already in flight.
    /// 整筆寫入紀錄；若已有寫入進行中則放入待寫槽位。
    ///
    /// The caller that started the write keeps draining the pending slot until it
    /// is empty, so the last record handed in is the last one written.
    pub async fn persist<F>(
        &self,
        fs: &F,
        record: SessionRecord,
    ) -> Result<PersistOutcome, SessionError>
    where
        F: HostFs + ?Sized,
    {
        if self.in_flight.get() {
            *self.pending.borrow_mut() = Some(record);
            debug!("session write in flight, queued latest record");
            return Ok(PersistOutcome::Queued);
        }

        self.in_flight.set(true);
        let _guard = InFlightGuard(&self.in_flight);
        let mut next = Some(record);
        let mut result = Ok(PersistOutcome::Written);
        while let Some(record) = next {
            result = self.write_record(fs, &record).await;
            next = self.pending.borrow_mut().take();
        }
        result
    }

    async fn write_record<F>(
        &self,
        fs: &F,
        record: &SessionRecord,
    ) -> Result<PersistOutcome, SessionError>
    where
        F: HostFs + ?Sized,
    {
        let json = serde_json::to_string_pretty(record)?;
        fs.write_file(&self.session_path, &json).await?;
        debug!(
            path = %self.session_path.display(),
            files = record.opened_file_paths.len(),
            "session written"
        );
        Ok(PersistOutcome::Written)
    }
}

struct InFlightGuard<'a>(&'a Cell<bool>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Checks each persisted path independently against the file system.
/// 逐一檢查紀錄中的路徑是否仍然存在。
pub async fn validate_record<F>(fs: &F, record: &SessionRecord) -> SessionValidation
where
    F: HostFs + ?Sized,
{
    let folder = match record.last_opened_folder.as_deref() {
        Some(folder) if fs.entry_kind(folder).await == Some(EntryKind::Directory) => {
            Some(folder.to_path_buf())
        }
        _ => None,
    };

    let mut valid_files = Vec::new();
    for path in &record.opened_file_paths {
        if fs.entry_kind(path).await == Some(EntryKind::File) {
            valid_files.push(path.clone());
        } else {
            debug!(path = %path.display(), "dropping missing session file");
        }
    }

    let active_file = record
        .active_file_path
        .as_ref()
        .filter(|active| valid_files.contains(active))
        .cloned();

    SessionValidation {
        is_valid: folder.is_some() || !valid_files.is_empty(),
        folder,
        valid_files,
        active_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkedit_core::{DocumentStore, LocalHostFs, MemoryHostFs};
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingTarget {
        store: DocumentStore,
        folder: Option<PathBuf>,
    }

    #[async_trait(?Send)]
    impl RestoreTarget for RecordingTarget {
        async fn restore_folder(&mut self, folder: &Path) -> bool {
            self.folder = Some(folder.to_path_buf());
            true
        }

        fn restore_document(&mut self, path: &Path, content: String) -> Option<DocumentId> {
            Some(
                self.store
                    .create_document("", Some(path.to_path_buf()), content, "plaintext"),
            )
        }

        fn restore_active(&mut self, path: &Path) -> bool {
            match self.store.find_by_path(path).map(Document::id) {
                Some(id) => {
                    self.store.activate(id);
                    true
                }
                None => false,
            }
        }
    }

    fn record(folder: Option<&str>, files: &[&str], active: Option<&str>) -> SessionRecord {
        SessionRecord {
            last_opened_folder: folder.map(PathBuf::from),
            opened_file_paths: files.iter().map(PathBuf::from).collect(),
            active_file_path: active.map(PathBuf::from),
        }
    }

    #[test]
    fn record_serializes_exactly_three_fields() {
        let json = serde_json::to_value(record(Some("/w"), &["/w/a.txt"], None)).unwrap();
        let object = json.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["active_file_path", "last_opened_folder", "opened_file_paths"]
        );
        assert!(object["active_file_path"].is_null());
    }

    #[test]
    fn snapshot_excludes_untitled_documents() {
        let mut store = DocumentStore::new();
        store.create_document("", Some(PathBuf::from("/w/a.txt")), "", "plaintext");
        store.create_document("Untitled", None, "", "plaintext");

        let snapshot = SessionRecord::snapshot(Some(Path::new("/w")), store.all());
        assert_eq!(snapshot.opened_file_paths, vec![PathBuf::from("/w/a.txt")]);
        assert_eq!(snapshot.active_file_path, None);
    }

    #[tokio::test]
    async fn validation_filters_missing_paths() {
        let fs = MemoryHostFs::new();
        fs.add_file("/w/a.txt", "a");
        fs.add_dir("/w/sub");

        let validation = validate_record(
            &fs,
            &record(Some("/w"), &["/w/a.txt", "/w/c.txt", "/w/sub"], Some("/w/c.txt")),
        )
        .await;
        assert!(validation.is_valid);
        assert!(validation.folder_exists());
        assert_eq!(validation.valid_files, vec![PathBuf::from("/w/a.txt")]);
        assert_eq!(validation.active_file, None);
    }

    #[tokio::test]
    async fn session_without_folder_or_files_is_invalid() {
        let fs = MemoryHostFs::new();
        let validation =
            validate_record(&fs, &record(Some("/gone"), &["/gone/a.txt"], None)).await;
        assert!(!validation.is_valid);
        assert!(!validation.folder_exists());
    }

    #[tokio::test]
    async fn corrupt_session_is_treated_as_invalid() {
        let fs = MemoryHostFs::new();
        fs.add_file("/cfg/session.json", "{ not json");
        let store = SessionStore::new("/cfg/session.json");

        assert!(store.load(&fs).await.is_err());
        assert!(!store.validate(&fs).await.is_valid);

        let mut target = RecordingTarget::default();
        let outcome = store.restore(&fs, &mut target).await;
        assert!(!outcome.restored);
        assert!(target.store.is_empty());
    }

    #[tokio::test]
    async fn restore_reopens_files_in_order_and_active() {
        let fs = MemoryHostFs::new();
        fs.add_file("/w/a.txt", "alpha");
        fs.add_file("/w/b.txt", "beta");
        let store = SessionStore::new("/cfg/session.json");
        store
            .persist(&fs, record(Some("/w"), &["/w/a.txt", "/w/b.txt"], Some("/w/a.txt")))
            .await
            .unwrap();

        let mut target = RecordingTarget::default();
        let outcome = store.restore(&fs, &mut target).await;

        assert!(outcome.restored);
        assert!(outcome.folder_restored);
        assert_eq!(target.folder.as_deref(), Some(Path::new("/w")));
        let labels: Vec<_> = target.store.all().iter().map(|d| d.label().to_string()).collect();
        assert_eq!(labels, ["a.txt", "b.txt"]);
        assert_eq!(target.store.active().unwrap().content(), "alpha");
    }

    #[tokio::test]
    async fn restore_skips_unreadable_files() {
        let fs = MemoryHostFs::new();
        fs.add_file("/w/a.txt", "alpha");
        fs.add_file("/w/b.txt", "beta");
        fs.fail_read("/w/b.txt");
        let store = SessionStore::new("/cfg/session.json");
        store
            .persist(&fs, record(None, &["/w/a.txt", "/w/b.txt"], Some("/w/b.txt")))
            .await
            .unwrap();

        let mut target = RecordingTarget::default();
        let outcome = store.restore(&fs, &mut target).await;
        assert!(outcome.restored);
        assert!(!outcome.folder_restored);
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.skipped, vec![PathBuf::from("/w/b.txt")]);
    }

    #[tokio::test]
    async fn missing_session_file_loads_as_none() {
        let fs = MemoryHostFs::new();
        let store = SessionStore::new("/cfg/session.json");
        assert!(store.load(&fs).await.unwrap().is_none());
        assert_eq!(store.validate(&fs).await, SessionValidation::default());
    }

    #[tokio::test]
    async fn overlapping_persists_coalesce_to_latest() {
        let fs = MemoryHostFs::new();
        fs.set_yield_on_io(true);
        let store = SessionStore::new("/cfg/session.json");

        let (first, second, third) = tokio::join!(
            store.persist(&fs, record(None, &["/w/1.txt"], None)),
            store.persist(&fs, record(None, &["/w/2.txt"], None)),
            store.persist(&fs, record(None, &["/w/3.txt"], None)),
        );
        assert_eq!(first.unwrap(), PersistOutcome::Written);
        assert_eq!(second.unwrap(), PersistOutcome::Queued);
        assert_eq!(third.unwrap(), PersistOutcome::Queued);

        let writes = fs.writes_to(Path::new("/cfg/session.json"));
        assert_eq!(writes.len(), 2);
        assert_eq!(fs.max_concurrent_writes(), 1);
        let last: SessionRecord = serde_json::from_str(&writes[1]).unwrap();
        assert_eq!(last.opened_file_paths, vec![PathBuf::from("/w/3.txt")]);

        store.persist(&fs, SessionRecord::default()).await.unwrap();
        assert_eq!(fs.writes_to(Path::new("/cfg/session.json")).len(), 3);
    }

    #[tokio::test]
    async fn failed_write_releases_the_writer() {
        let fs = MemoryHostFs::new();
        let store = SessionStore::new("/cfg/session.json");
        fs.set_fail_writes(true);
        assert!(matches!(
            store.persist(&fs, SessionRecord::default()).await,
            Err(SessionError::Host(_))
        ));
        fs.set_fail_writes(false);
        assert_eq!(
            store.persist(&fs, SessionRecord::default()).await.unwrap(),
            PersistOutcome::Written
        );
    }

    #[tokio::test]
    async fn round_trips_on_disk() {
        let tmp = tempdir().unwrap();
        let folder = tmp.path().join("project");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("a.txt"), "alpha").unwrap();

        let fs = LocalHostFs::new();
        let store = SessionStore::new(tmp.path().join("config").join("session.json"));
        let saved = SessionRecord {
            last_opened_folder: Some(folder.clone()),
            opened_file_paths: vec![folder.join("a.txt")],
            active_file_path: Some(folder.join("a.txt")),
        };
        store.persist(&fs, saved.clone()).await.unwrap();

        assert_eq!(store.load(&fs).await.unwrap(), Some(saved));
        let validation = store.validate(&fs).await;
        assert!(validation.is_valid);
        assert_eq!(validation.active_file, Some(folder.join("a.txt")));
    }
}
