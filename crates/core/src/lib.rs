pub mod document;
pub mod document_store;
pub mod host;
pub mod language;
pub mod local_fs;
pub mod memory_fs;
pub mod surface;

pub use document::{label_for_path, Document, DocumentId, DocumentPatch, UNTITLED_LABEL};
pub use document_store::{Activation, DocumentEvent, DocumentStore};
pub use host::{
    sort_entries, CursorPosition, DirEntry, EntryKind, HostError, HostFs, SurfaceEvent,
    SurfaceListener, TextSurface,
};
pub use language::{detect_language, language_for_extension, PLAIN_TEXT};
pub use local_fs::{DialogAnswers, LocalHostFs};
pub use memory_fs::MemoryHostFs;
pub use surface::BufferSurface;
