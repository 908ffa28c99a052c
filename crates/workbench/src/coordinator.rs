use std::cell::{Cell, Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use inkedit_core::{
    detect_language, label_for_path, Activation, CursorPosition, Document, DocumentEvent,
    DocumentId, DocumentStore, HostError, HostFs, SurfaceEvent, TextSurface, PLAIN_TEXT,
    UNTITLED_LABEL,
};
use inkedit_project::{
    ExplorerError, ExplorerIntent, ExplorerNodeId, ExplorerTree, RestoreOutcome, RestoreTarget,
    SessionRecord, SessionStore,
};
use inkedit_search::{
    is_blank_query, search_text, search_tree, LineMatch, SearchError, SearchMatch, SearchReport,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::console::ConsoleLog;
use crate::events::{WorkbenchEvent, WorkbenchListener};

/// 工作台操作的錯誤。 / Errors surfaced by workbench operations.
///
/// Every failure is also written to the console; in-memory state is left as it
/// was before the failing step.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Explorer(#[from] ExplorerError),
    #[error("{} is already open in another tab", .0.display())]
    PathAlreadyOpen(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(DocumentId),
    /// The path was already open; its tab was activated instead.
    Activated(DocumentId),
    Cancelled,
}

impl OpenOutcome {
    pub fn document(&self) -> Option<DocumentId> {
        match *self {
            Self::Opened(id) | Self::Activated(id) => Some(id),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: DocumentId, path: PathBuf },
    Cancelled,
    NoActiveDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// The active document, as currently shown in the surface.
    Current,
    /// Every text file below the explorer root.
    Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    /// Blank query; result panels should clear.
    Cleared,
    Current {
        document: DocumentId,
        matches: Vec<LineMatch>,
    },
    Workspace(SearchReport),
    NoActiveDocument,
    NoFolder,
}

/// State reachable from the surface's change listener.
struct Shared {
    documents: RefCell<DocumentStore>,
    suppress_surface_events: Cell<bool>,
    console: RefCell<ConsoleLog>,
    listeners: RefCell<Vec<WorkbenchListener>>,
}

impl Shared {
    fn on_surface_event(&self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::ContentChanged => {
                if self.suppress_surface_events.get() {
                    trace!("ignoring programmatic surface change");
                    return;
                }
                let newly_dirty = {
                    let mut documents = self.documents.borrow_mut();
                    let clean_active = documents
                        .active()
                        .filter(|doc| !doc.is_modified())
                        .map(Document::id);
                    if let Some(id) = clean_active {
                        documents.set_modified(id, true);
                    }
                    clean_active
                };
                if let Some(id) = newly_dirty {
                    debug!(%id, "document modified");
                    self.emit(WorkbenchEvent::DocumentModified(id));
                }
            }
        }
    }

    fn emit(&self, event: WorkbenchEvent) {
        let mut listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for listener in &mut listeners {
            listener(&event);
        }
        let mut slot = self.listeners.borrow_mut();
        listeners.append(&mut slot);
        *slot = listeners;
    }
}

/// Raises the suppression flag for the lifetime of a programmatic surface update.
struct SuppressGuard<'a>(&'a Cell<bool>);

impl<'a> SuppressGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 協調文件、工作階段、檔案總管與編輯元件的流程。 / Sequences every multi-step workbench operation.
///
/// The coordinator is the only writer of the shared [`TextSurface`]. All state
/// sits behind `RefCell`s and no borrow is held across an `.await`, so
/// operations may interleave at their I/O points on a single-threaded executor.
pub struct Coordinator<F, S>
where
    F: HostFs,
    S: TextSurface,
{
    host: F,
    surface: RefCell<S>,
    shared: Rc<Shared>,
    explorer: RefCell<ExplorerTree>,
    session: SessionStore,
}

impl<F, S> Coordinator<F, S>
where
    F: HostFs,
    S: TextSurface,
{
    pub fn new(host: F, mut surface: S, session_path: impl AsRef<Path>) -> Self {
        let shared = Rc::new(Shared {
            documents: RefCell::new(DocumentStore::new()),
            suppress_surface_events: Cell::new(false),
            console: RefCell::new(ConsoleLog::default()),
            listeners: RefCell::new(Vec::new()),
        });
        let weak: Weak<Shared> = Rc::downgrade(&shared);
        surface.subscribe(Box::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_surface_event(event);
            }
        }));
        Self {
            host,
            surface: RefCell::new(surface),
            shared,
            explorer: RefCell::new(ExplorerTree::new()),
            session: SessionStore::new(session_path),
        }
    }

    pub fn host(&self) -> &F {
        &self.host
    }

    pub fn documents(&self) -> Ref<'_, DocumentStore> {
        self.shared.documents.borrow()
    }

    pub fn surface(&self) -> Ref<'_, S> {
        self.surface.borrow()
    }

    /// Direct access for hosts that forward user input; drop it before calling
    /// any other coordinator operation.
    pub fn surface_mut(&self) -> RefMut<'_, S> {
        self.surface.borrow_mut()
    }

    pub fn explorer(&self) -> Ref<'_, ExplorerTree> {
        self.explorer.borrow()
    }

    pub fn console(&self) -> Ref<'_, ConsoleLog> {
        self.shared.console.borrow()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Registers a listener; it must not call back into the coordinator.
    pub fn subscribe(&self, listener: impl FnMut(&WorkbenchEvent) + 'static) {
        self.shared.listeners.borrow_mut().push(Box::new(listener));
    }

    /// 建立未命名的新文件。 / Creates an empty untitled document and shows it.
    pub fn new_file(&self) -> DocumentId {
        self.sync_outgoing_snapshot();
        let id = self.shared.documents.borrow_mut().create_document(
            UNTITLED_LABEL,
            None,
            String::new(),
            PLAIN_TEXT,
        );
        self.dispatch_document_events();
        self.log_info("New file created");
        id
    }

    /// 透過對話框開啟檔案。 / Asks the host for a file and opens it.
    pub async fn open_file_dialog(&self) -> Result<OpenOutcome, WorkbenchError> {
        let picked = self.host.open_file_dialog().await;
        match self.reported(picked)? {
            Some(path) => self.open_path(&path).await,
            None => Ok(OpenOutcome::Cancelled),
        }
    }

    /// 開啟檔案；已開啟的路徑只會切換分頁。 / Opens `path`, or activates its tab if already open.
    ///
    /// The open-tab check runs again after the read completes, so two overlapping
    /// opens of one path end with a single document.
    pub async fn open_path(&self, path: &Path) -> Result<OpenOutcome, WorkbenchError> {
        if let Some(id) = self.document_for_path(path) {
            self.activate(id);
            return Ok(OpenOutcome::Activated(id));
        }

        let read = self.host.read_file(path).await;
        let content = self.reported(read)?;

        if let Some(id) = self.document_for_path(path) {
            debug!(path = %path.display(), "path opened while reading, reusing tab");
            self.activate(id);
            return Ok(OpenOutcome::Activated(id));
        }

        let id = self.create_file_document(path, content);
        self.log_info(format!("File opened: {}", path.display()));
        self.persist_session().await;
        Ok(OpenOutcome::Opened(id))
    }

    /// 透過對話框開啟資料夾。 / Asks the host for a folder and opens it.
    pub async fn open_folder_dialog(&self) -> Result<Option<PathBuf>, WorkbenchError> {
        let picked = self.host.open_folder_dialog().await;
        match self.reported(picked)? {
            Some(path) => {
                self.open_folder(&path).await?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// 將資料夾載入檔案總管。 / Roots the explorer at `folder` and persists the session.
    pub async fn open_folder(&self, folder: &Path) -> Result<(), WorkbenchError> {
        self.load_folder(folder).await?;
        self.log_info(format!("Folder opened: {}", folder.display()));
        self.shared
            .emit(WorkbenchEvent::FolderOpened(folder.to_path_buf()));
        self.persist_session().await;
        Ok(())
    }

    /// 重新整理檔案總管，保留仍存在資料夾的展開狀態。 / Reloads the explorer, keeping folders that still exist expanded.
    pub async fn refresh_tree(&self) -> Result<(), WorkbenchError> {
        let Some(root) = self.explorer.borrow().root_path().map(Path::to_path_buf) else {
            return Ok(());
        };
        let expanded = self.explorer.borrow().expanded_paths();
        self.load_folder(&root).await?;

        for path in expanded {
            let Some(id) = self
                .explorer
                .borrow()
                .find_by_path(&path)
                .filter(|node| node.is_folder())
                .map(|node| node.id)
            else {
                continue;
            };
            match self.host.read_directory(&path).await {
                Ok(entries) => self.explorer.borrow_mut().attach_children(id, entries)?,
                Err(err) => debug!(path = %path.display(), %err, "folder vanished during refresh"),
            }
        }
        self.log_info("File tree refreshed");
        Ok(())
    }

    /// 點擊檔案總管節點。 / Handles a click on an explorer node.
    pub async fn activate_explorer_node(
        &self,
        id: ExplorerNodeId,
    ) -> Result<ExplorerIntent, WorkbenchError> {
        let intent = self.explorer.borrow_mut().activate(id)?;
        match &intent {
            ExplorerIntent::OpenFile(path) => {
                self.open_path(path).await?;
            }
            ExplorerIntent::LoadChildren { id, path } => {
                let listing = self.host.read_directory(path).await;
                let entries = self.reported(listing)?;
                self.explorer.borrow_mut().attach_children(*id, entries)?;
            }
            ExplorerIntent::Expanded(_) | ExplorerIntent::Collapsed(_) => {}
        }
        Ok(intent)
    }

    /// 切換分頁。 / Activates a tab, saving the outgoing tab's live text first.
    pub fn activate(&self, id: DocumentId) -> Activation {
        let switching = {
            let documents = self.shared.documents.borrow();
            documents.get(id).is_some() && documents.active_id() != Some(id)
        };
        if switching {
            self.sync_outgoing_snapshot();
        }
        let activation = self.shared.documents.borrow_mut().activate(id);
        self.dispatch_document_events();
        activation
    }

    /// 關閉分頁；不會因未儲存而阻擋。 / Closes a tab unconditionally. Not persisted.
    pub fn close(&self, id: DocumentId) -> bool {
        let closed = self.shared.documents.borrow_mut().close(id);
        if closed {
            debug!(%id, "document closed");
        }
        self.dispatch_document_events();
        closed
    }

    pub fn close_all(&self) {
        self.shared.documents.borrow_mut().close_all();
        self.dispatch_document_events();
    }

    /// 儲存使用中的文件；無路徑時改走另存新檔。 / Saves the active document, routing untitled ones to save-as.
    pub async fn save(&self) -> Result<SaveOutcome, WorkbenchError> {
        let Some((id, path)) = self
            .shared
            .documents
            .borrow()
            .active()
            .map(|doc| (doc.id(), doc.path().map(Path::to_path_buf)))
        else {
            return Ok(SaveOutcome::NoActiveDocument);
        };
        let Some(path) = path else {
            return self.save_as().await;
        };

        let content = self.current_text(id);
        let written = self.host.write_file(&path, &content).await;
        self.reported(written)?;

        {
            let mut documents = self.shared.documents.borrow_mut();
            documents.update_content(id, content);
            documents.set_modified(id, false);
        }
        self.log_info(format!("File saved: {}", path.display()));
        self.shared.emit(WorkbenchEvent::DocumentSaved {
            id,
            path: path.clone(),
        });
        self.persist_session().await;
        Ok(SaveOutcome::Saved { id, path })
    }

    /// 另存新檔。 / Asks for a path and writes the active document there.
    ///
    /// Refuses a path that another tab already has open.
    pub async fn save_as(&self) -> Result<SaveOutcome, WorkbenchError> {
        let Some((id, label)) = self
            .shared
            .documents
            .borrow()
            .active()
            .map(|doc| (doc.id(), doc.label().to_string()))
        else {
            return Ok(SaveOutcome::NoActiveDocument);
        };

        let picked = self.host.save_file_dialog(Some(&label)).await;
        let Some(path) = self.reported(picked)? else {
            return Ok(SaveOutcome::Cancelled);
        };
        if self.path_owned_by_other(id, &path) {
            let err = WorkbenchError::PathAlreadyOpen(path);
            self.log_error(&err);
            return Err(err);
        }

        let content = self.current_text(id);
        let written = self.host.write_file(&path, &content).await;
        self.reported(written)?;

        let language = {
            let mut documents = self.shared.documents.borrow_mut();
            if !documents.update_path(id, &path) {
                warn!(path = %path.display(), "saved file is now open in another tab");
            }
            documents.update_content(id, content);
            documents.set_modified(id, false);
            documents
                .get(id)
                .filter(|doc| doc.is_active())
                .map(|doc| doc.language().to_string())
        };
        if let Some(language) = language {
            self.surface.borrow_mut().set_language(&language);
        }
        self.log_info(format!("File saved as: {}", path.display()));
        self.shared.emit(WorkbenchEvent::DocumentSaved {
            id,
            path: path.clone(),
        });
        self.persist_session().await;
        Ok(SaveOutcome::Saved { id, path })
    }

    /// 搜尋目前檔案或整個工作區。 / Searches the active document or the explorer root.
    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
    ) -> Result<SearchResults, WorkbenchError> {
        if is_blank_query(query) {
            return Ok(SearchResults::Cleared);
        }
        match scope {
            SearchScope::Current => {
                let Some(id) = self.shared.documents.borrow().active_id() else {
                    return Ok(SearchResults::NoActiveDocument);
                };
                let text = self.surface.borrow().value();
                let matches = search_text(&text, query)?;
                Ok(SearchResults::Current {
                    document: id,
                    matches,
                })
            }
            SearchScope::Workspace => {
                let Some(root) = self.explorer.borrow().root_path().map(Path::to_path_buf) else {
                    return Ok(SearchResults::NoFolder);
                };
                let matches = search_tree(&self.host, &root, query).await?;
                let report = SearchReport::new(query, matches);
                let summary = report.summary();
                self.log_info(format!(
                    "Search \"{query}\": {} hits in {} files",
                    summary.total_matches, summary.files_with_matches
                ));
                Ok(SearchResults::Workspace(report))
            }
        }
    }

    /// 跳到搜尋結果；必要時先開啟檔案。 / Opens (or activates) the match's file, then moves the caret to it.
    pub async fn jump_to_match(&self, found: &SearchMatch) -> Result<OpenOutcome, WorkbenchError> {
        let outcome = self.open_path(&found.file_path).await?;
        self.jump_to_line(found.line_number, found.match_start + 1);
        Ok(outcome)
    }

    /// 在目前檔案中跳到指定行。 / Moves the caret to a 1-based line and column and focuses the surface.
    pub fn jump_to_line(&self, line: usize, column: usize) {
        let mut surface = self.surface.borrow_mut();
        surface.set_cursor(CursorPosition::new(line, column));
        surface.reveal_line(line);
        surface.focus();
    }

    /// 還原上次的工作階段。 / Restores the persisted session; invalid sessions leave an empty workspace.
    pub async fn restore_session(&self) -> RestoreOutcome {
        let mut target = RestoreAdapter { coordinator: self };
        let outcome = self.session.restore(&self.host, &mut target).await;
        if outcome.restored {
            self.log_info(format!(
                "Session restored: {} file(s)",
                outcome.documents.len()
            ));
        }
        outcome
    }

    /// 儲存工作階段；失敗只會記錄。 / Writes the session record; failures are logged and absorbed.
    pub async fn persist_session(&self) {
        let record = {
            let explorer = self.explorer.borrow();
            let documents = self.shared.documents.borrow();
            SessionRecord::snapshot(explorer.root_path(), documents.all())
        };
        if let Err(err) = self.session.persist(&self.host, record).await {
            warn!(%err, "failed to persist session");
            self.shared
                .console
                .borrow_mut()
                .error(format!("Failed to save session: {err}"));
        }
    }

    /// Re-measures the surface after its container changed size.
    pub fn layout_surface(&self) {
        self.surface.borrow_mut().layout();
    }

    /// Tears down the surface; listeners stop receiving edits.
    pub fn dispose(&self) {
        self.surface.borrow_mut().dispose();
    }

    /// Disposes the surface and hands back the host, e.g. to start a fresh workbench on it.
    pub fn into_host(self) -> F {
        self.dispose();
        self.host
    }

    async fn load_folder(&self, folder: &Path) -> Result<(), WorkbenchError> {
        let listing = self.host.read_directory(folder).await;
        let entries = self.reported(listing)?;
        self.explorer.borrow_mut().set_root(folder, entries);
        Ok(())
    }

    fn create_file_document(&self, path: &Path, content: String) -> DocumentId {
        self.sync_outgoing_snapshot();
        let id = self.shared.documents.borrow_mut().create_document(
            label_for_path(path),
            Some(path.to_path_buf()),
            content,
            detect_language(path),
        );
        self.dispatch_document_events();
        id
    }

    fn document_for_path(&self, path: &Path) -> Option<DocumentId> {
        self.shared
            .documents
            .borrow()
            .find_by_path(path)
            .map(Document::id)
    }

    fn path_owned_by_other(&self, id: DocumentId, path: &Path) -> bool {
        self.document_for_path(path).is_some_and(|owner| owner != id)
    }

    /// The surface holds the live text of the active document; other documents
    /// are represented by their snapshot.
    fn current_text(&self, id: DocumentId) -> String {
        let is_active = self.shared.documents.borrow().active_id() == Some(id);
        if is_active {
            return self.surface.borrow().value();
        }
        self.shared
            .documents
            .borrow()
            .get(id)
            .map(|doc| doc.content().to_string())
            .unwrap_or_default()
    }

    fn sync_outgoing_snapshot(&self) {
        let Some(active) = self.shared.documents.borrow().active_id() else {
            return;
        };
        let value = self.surface.borrow().value();
        self.shared
            .documents
            .borrow_mut()
            .update_content(active, value);
    }

    fn dispatch_document_events(&self) {
        loop {
            let events = self.shared.documents.borrow_mut().take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    DocumentEvent::ActiveChanged(doc) => {
                        self.push_to_surface(doc.content(), doc.language());
                        self.shared
                            .emit(WorkbenchEvent::ActiveDocumentChanged(doc.id()));
                    }
                    DocumentEvent::AllClosed => {
                        self.push_to_surface("", PLAIN_TEXT);
                        self.shared.emit(WorkbenchEvent::AllDocumentsClosed);
                    }
                }
            }
        }
    }

    fn push_to_surface(&self, text: &str, language: &str) {
        let _guard = SuppressGuard::raise(&self.shared.suppress_surface_events);
        let mut surface = self.surface.borrow_mut();
        surface.set_value(text);
        surface.set_language(language);
    }

    fn reported<T>(&self, result: Result<T, HostError>) -> Result<T, WorkbenchError> {
        result.map_err(|err| {
            let err = WorkbenchError::from(err);
            self.log_error(&err);
            err
        })
    }

    fn log_info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.shared.console.borrow_mut().info(message);
    }

    fn log_error(&self, err: &WorkbenchError) {
        warn!(%err, "workbench operation failed");
        self.shared.console.borrow_mut().error(err.to_string());
    }
}

struct RestoreAdapter<'a, F, S>
where
    F: HostFs,
    S: TextSurface,
{
    coordinator: &'a Coordinator<F, S>,
}

#[async_trait(?Send)]
impl<F, S> RestoreTarget for RestoreAdapter<'_, F, S>
where
    F: HostFs,
    S: TextSurface,
{
    async fn restore_folder(&mut self, folder: &Path) -> bool {
        match self.coordinator.load_folder(folder).await {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "session folder could not be listed");
                false
            }
        }
    }

    fn restore_document(&mut self, path: &Path, content: String) -> Option<DocumentId> {
        if let Some(id) = self.coordinator.document_for_path(path) {
            return Some(id);
        }
        Some(self.coordinator.create_file_document(path, content))
    }

    fn restore_active(&mut self, path: &Path) -> bool {
        match self.coordinator.document_for_path(path) {
            Some(id) => self.coordinator.activate(id) != Activation::NotFound,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkedit_core::{BufferSurface, MemoryHostFs};

    type TestCoordinator = Coordinator<MemoryHostFs, BufferSurface>;

    fn coordinator() -> TestCoordinator {
        let host = MemoryHostFs::new();
        host.add_file("/w/a.txt", "alpha");
        host.add_file("/w/b.rs", "fn beta() {}");
        Coordinator::new(host, BufferSurface::new(), "/cfg/session.json")
    }

    #[test]
    fn new_file_is_untitled_and_clean() {
        let c = coordinator();
        let id = c.new_file();
        let docs = c.documents();
        let doc = docs.get(id).unwrap();
        assert!(doc.label().starts_with("Untitled-"));
        assert!(doc.path().is_none());
        assert!(!doc.is_modified());
        assert_eq!(c.surface().language(), PLAIN_TEXT);
    }

    #[tokio::test]
    async fn open_pushes_content_without_dirtying() {
        let c = coordinator();
        let outcome = c.open_path(Path::new("/w/b.rs")).await.unwrap();
        let id = outcome.document().unwrap();

        assert_eq!(c.surface().value(), "fn beta() {}");
        assert_eq!(c.surface().language(), "rust");
        assert!(!c.documents().get(id).unwrap().is_modified());
        assert!(c.console().contains("File opened: /w/b.rs"));
    }

    #[tokio::test]
    async fn user_edit_marks_active_document_dirty_once() {
        let c = coordinator();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        c.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let id = c.open_path(Path::new("/w/a.txt")).await.unwrap().document().unwrap();
        c.surface_mut().user_edit("alpha!");
        c.surface_mut().user_edit("alpha!!");

        assert!(c.documents().get(id).unwrap().is_modified());
        let modified = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, WorkbenchEvent::DocumentModified(_)))
            .count();
        assert_eq!(modified, 1);
    }

    #[tokio::test]
    async fn failed_read_leaves_state_untouched() {
        let c = coordinator();
        let err = c.open_path(Path::new("/w/missing.txt")).await.unwrap_err();
        assert!(matches!(err, WorkbenchError::Host(HostError::NotFound(_))));
        assert!(c.documents().is_empty());
        assert_eq!(c.console().errors().count(), 1);
        assert!(c.host().writes().is_empty());
    }

    #[tokio::test]
    async fn switching_tabs_keeps_live_edits() {
        let c = coordinator();
        let a = c.open_path(Path::new("/w/a.txt")).await.unwrap().document().unwrap();
        c.surface_mut().user_edit("edited alpha");
        let b = c.open_path(Path::new("/w/b.rs")).await.unwrap().document().unwrap();

        assert_eq!(c.activate(a), Activation::Changed);
        assert_eq!(c.surface().value(), "edited alpha");
        assert!(c.documents().get(a).unwrap().is_modified());
        assert!(!c.documents().get(b).unwrap().is_modified());
    }

    #[tokio::test]
    async fn save_writes_surface_text_and_clears_dirty() {
        let c = coordinator();
        let id = c.open_path(Path::new("/w/a.txt")).await.unwrap().document().unwrap();
        c.surface_mut().user_edit("new text");

        let outcome = c.save().await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                id,
                path: PathBuf::from("/w/a.txt")
            }
        );
        assert_eq!(c.host().file_contents(Path::new("/w/a.txt")).unwrap(), "new text");
        let docs = c.documents();
        assert!(!docs.get(id).unwrap().is_modified());
        assert_eq!(docs.get(id).unwrap().content(), "new text");
    }

    #[tokio::test]
    async fn save_untitled_routes_to_save_as() {
        let c = coordinator();
        let id = c.new_file();
        c.surface_mut().user_edit("print('hi')");
        c.host().queue_save_file(Some(PathBuf::from("/w/script.py")));

        let outcome = c.save().await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));
        let docs = c.documents();
        let doc = docs.get(id).unwrap();
        assert_eq!(doc.label(), "script.py");
        assert_eq!(doc.language(), "python");
        assert_eq!(c.surface().language(), "python");
        assert!(c.host().save_dialog_defaults()[0]
            .as_deref()
            .unwrap()
            .starts_with("Untitled-"));
    }

    #[tokio::test]
    async fn cancelled_dialogs_are_not_errors() {
        let c = coordinator();
        assert_eq!(c.open_file_dialog().await.unwrap(), OpenOutcome::Cancelled);
        assert_eq!(c.save().await.unwrap(), SaveOutcome::NoActiveDocument);
        c.new_file();
        assert_eq!(c.save_as().await.unwrap(), SaveOutcome::Cancelled);
        assert_eq!(c.console().errors().count(), 0);
    }

    #[tokio::test]
    async fn save_as_refuses_path_open_elsewhere() {
        let c = coordinator();
        c.open_path(Path::new("/w/a.txt")).await.unwrap();
        c.new_file();
        c.host().queue_save_file(Some(PathBuf::from("/w/a.txt")));

        let err = c.save_as().await.unwrap_err();
        assert!(matches!(err, WorkbenchError::PathAlreadyOpen(_)));
        assert_eq!(c.host().file_contents(Path::new("/w/a.txt")).unwrap(), "alpha");
        assert_eq!(c.documents().len(), 2);
    }

    #[tokio::test]
    async fn closing_last_tab_clears_surface() {
        let c = coordinator();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        c.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let id = c.open_path(Path::new("/w/a.txt")).await.unwrap().document().unwrap();
        assert!(c.close(id));
        assert_eq!(c.surface().value(), "");
        assert_eq!(events.borrow().last(), Some(&WorkbenchEvent::AllDocumentsClosed));
        assert!(!c.close(id));
    }

    #[tokio::test]
    async fn current_search_uses_live_surface_text() {
        let c = coordinator();
        assert_eq!(
            c.search("x", SearchScope::Current).await.unwrap(),
            SearchResults::NoActiveDocument
        );
        c.open_path(Path::new("/w/a.txt")).await.unwrap();
        c.surface_mut().user_edit("one\ntwo one");

        let SearchResults::Current { matches, .. } =
            c.search("one", SearchScope::Current).await.unwrap()
        else {
            panic!("expected current-file results");
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].line_number, 2);
        assert_eq!(
            c.search("  ", SearchScope::Current).await.unwrap(),
            SearchResults::Cleared
        );
        assert_eq!(
            c.search("one", SearchScope::Workspace).await.unwrap(),
            SearchResults::NoFolder
        );
    }

    #[tokio::test]
    async fn jump_to_line_moves_cursor_and_focuses() {
        let c = coordinator();
        c.open_path(Path::new("/w/a.txt")).await.unwrap();
        c.surface_mut().user_edit("1\n2\n3");
        c.jump_to_line(3, 1);
        let surface = c.surface();
        assert_eq!(surface.cursor(), CursorPosition::new(3, 1));
        assert_eq!(surface.revealed_line(), Some(3));
        assert!(surface.is_focused());
    }

    #[test]
    fn layout_and_dispose_reach_the_surface() {
        let c = coordinator();
        c.layout_surface();
        c.layout_surface();
        assert_eq!(c.surface().layout_passes(), 2);
        c.dispose();
        assert!(c.surface().is_disposed());
    }

    #[tokio::test]
    async fn persist_failure_is_absorbed() {
        let c = coordinator();
        c.host().set_fail_writes(true);
        let outcome = c.open_path(Path::new("/w/a.txt")).await.unwrap();
        assert!(matches!(outcome, OpenOutcome::Opened(_)));
        assert!(c.console().contains("Failed to save session"));
    }
}
