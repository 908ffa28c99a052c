use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{label_for_path, Document, DocumentId, DocumentPatch};
use crate::language::detect_language;

/// 文件集合發出的通知。 / Notifications produced by the [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// 使用中的文件已切換，附帶完整快照。 / The active document changed; carries its full snapshot.
    ActiveChanged(Document),
    /// 所有分頁皆已關閉。 / The last document was closed.
    AllClosed,
}

/// `activate` 的結果。 / Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Changed,
    AlreadyActive,
    NotFound,
}

/// 管理所有開啟中的分頁與目前使用中的文件。 / Owns the ordered set of open documents and the active selection.
///
/// The store performs no I/O. Activation changes are queued as [`DocumentEvent`]s
/// and handed to the single consumer through [`DocumentStore::take_events`].
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    active: Option<DocumentId>,
    created: u64,
    events: Vec<DocumentEvent>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立新文件並立即設為使用中。 / Appends a new document and makes it the active one.
    ///
    /// Documents with a path are labelled after their file name; untitled ones get
    /// `"{label}-{n}"`, where `n` counts every document this store has created.
    pub fn create_document(
        &mut self,
        label: impl Into<String>,
        path: Option<PathBuf>,
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> DocumentId {
        self.created += 1;
        let id = DocumentId::next();
        let label = match path.as_deref() {
            Some(path) => label_for_path(path),
            None => format!("{}-{}", label.into(), self.created),
        };
        debug!(%id, %label, "creating document");
        self.documents.push(Document::new(
            id,
            label,
            path,
            content.into(),
            language.into(),
        ));
        self.switch_active(id);
        id
    }

    /// 切換使用中的文件。 / Makes `id` the active document.
    pub fn activate(&mut self, id: DocumentId) -> Activation {
        if self.index_of(id).is_none() {
            return Activation::NotFound;
        }
        if self.active == Some(id) {
            return Activation::AlreadyActive;
        }
        self.switch_active(id);
        Activation::Changed
    }

    /// 關閉文件；未儲存的變更不會阻擋關閉。 / Removes a document unconditionally, even when modified.
    ///
    /// When the active document is closed, activation falls to the first remaining
    /// document in tab order. Returns `false` for unknown ids.
    pub fn close(&mut self, id: DocumentId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let removed = self.documents.remove(index);
        if removed.is_modified() {
            debug!(%id, label = removed.label(), "closing document with unsaved changes");
        }
        if self.active == Some(id) {
            self.active = None;
            match self.documents.first().map(Document::id) {
                Some(next) => self.switch_active(next),
                None => self.events.push(DocumentEvent::AllClosed),
            }
        }
        true
    }

    /// 關閉全部分頁。 / Destroys the whole set.
    pub fn close_all(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        self.documents.clear();
        self.active = None;
        self.events.push(DocumentEvent::AllClosed);
    }

    /// 設定修改旗標。 / Sets the dirty flag; returns `false` for unknown ids.
    pub fn set_modified(&mut self, id: DocumentId, is_modified: bool) -> bool {
        match self.get_mut(id) {
            Some(doc) => {
                doc.set_modified(is_modified);
                true
            }
            None => false,
        }
    }

    /// 更新內容快照。 / Replaces the content snapshot.
    pub fn update_content(&mut self, id: DocumentId, content: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(doc) => {
                doc.set_content(content.into());
                true
            }
            None => false,
        }
    }

    /// 更新檔案路徑，並重新計算名稱與語言。 / Re-points a document at `path`, recomputing label and language.
    ///
    /// Refused (returns `false`) when another document already owns `path`.
    pub fn update_path(&mut self, id: DocumentId, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.path_owned_by_other(id, &path) {
            debug!(%id, path = %path.display(), "path already owned by another document");
            return false;
        }
        match self.get_mut(id) {
            Some(doc) => {
                doc.set_label(label_for_path(&path));
                doc.set_language(detect_language(&path).to_string());
                doc.set_path(Some(path));
                true
            }
            None => false,
        }
    }

    /// 套用部分欄位更新。 / Applies a partial update. Path changes obey the same uniqueness rule as [`update_path`](Self::update_path).
    pub fn update_fields(&mut self, id: DocumentId, patch: DocumentPatch) -> bool {
        if let Some(path) = patch.path.as_deref() {
            if self.path_owned_by_other(id, path) {
                return false;
            }
        }
        let Some(doc) = self.get_mut(id) else {
            return false;
        };
        if let Some(label) = patch.label {
            doc.set_label(label);
        }
        if let Some(path) = patch.path {
            doc.set_path(Some(path));
        }
        if let Some(content) = patch.content {
            doc.set_content(content);
        }
        if let Some(language) = patch.language {
            doc.set_language(language);
        }
        true
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id() == id)
    }

    /// 依路徑尋找文件。 / Finds the document bound to `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.path() == Some(path))
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    /// 依分頁順序列出所有文件。 / All documents in tab order.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// 尚有未儲存變更的文件。 / Documents with unsaved changes, for close/quit prompts.
    pub fn dirty_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(|doc| doc.is_modified())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// 取出尚未處理的通知。 / Drains pending notifications in emission order.
    pub fn take_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    fn switch_active(&mut self, id: DocumentId) {
        if let Some(previous) = self.active.take() {
            if let Some(doc) = self.get_mut(previous) {
                doc.set_active(false);
            }
        }
        let snapshot = match self.get_mut(id) {
            Some(doc) => {
                doc.set_active(true);
                doc.clone()
            }
            None => return,
        };
        self.active = Some(id);
        self.events.push(DocumentEvent::ActiveChanged(snapshot));
    }

    fn path_owned_by_other(&self, id: DocumentId, path: &Path) -> bool {
        self.find_by_path(path).is_some_and(|doc| doc.id() != id)
    }

    fn index_of(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == id)
    }

    fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|doc| doc.id() == id)
    }
}
