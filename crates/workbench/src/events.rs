use std::path::PathBuf;

use inkedit_core::DocumentId;

/// 工作台對外發出的通知。 / Notifications for UI chrome (tab strip, title bar, welcome view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchEvent {
    /// A document was pushed into the surface as the active tab.
    ActiveDocumentChanged(DocumentId),
    /// A user edit turned a clean document dirty.
    DocumentModified(DocumentId),
    DocumentSaved { id: DocumentId, path: PathBuf },
    /// The last tab closed; show the welcome view.
    AllDocumentsClosed,
    FolderOpened(PathBuf),
}

/// 通知的監聽函式。 / Callback registered with `Coordinator::subscribe`.
pub type WorkbenchListener = Box<dyn FnMut(&WorkbenchEvent)>;
