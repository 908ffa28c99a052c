use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// 分頁文件的唯一識別碼，行程存活期間不會重複使用。 / Unique tab identifier; never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// 代表一個開啟中的分頁文件。 / One open, editable tab held by the [`DocumentStore`](crate::DocumentStore).
///
/// `content` is the snapshot held by the store; the live text shown to the user
/// lives in the text surface and may be ahead of it until the next sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    label: String,
    path: Option<PathBuf>,
    content: String,
    language: String,
    is_modified: bool,
    is_active: bool,
}

impl Document {
    pub(crate) fn new(
        id: DocumentId,
        label: String,
        path: Option<PathBuf>,
        content: String,
        language: String,
    ) -> Self {
        Self {
            id,
            label,
            path,
            content,
            language,
            is_modified: false,
            is_active: false,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// 分頁上顯示的名稱。 / Display name shown on the tab.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 對應的檔案路徑；`None` 表示尚未儲存。 / Associated file path; `None` for untitled documents.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the label decorated the way tab strips render dirty tabs.
    pub fn display_label(&self) -> String {
        if self.is_modified {
            format!("● {}", self.label)
        } else {
            self.label.clone()
        }
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub(crate) fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub(crate) fn set_language(&mut self, language: String) {
        self.language = language;
    }

    pub(crate) fn set_modified(&mut self, is_modified: bool) {
        self.is_modified = is_modified;
    }

    pub(crate) fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }
}

/// 部分欄位更新；`None` 代表保持原值。 / Partial field update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub label: Option<String>,
    pub path: Option<PathBuf>,
    pub content: Option<String>,
    pub language: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.path.is_none()
            && self.content.is_none()
            && self.language.is_none()
    }
}

/// 由路徑取得分頁名稱。 / Derives a tab label from the final path component.
pub fn label_for_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNTITLED_LABEL.to_string())
}

/// 未命名文件的預設名稱。 / Base label for untitled documents.
pub const UNTITLED_LABEL: &str = "Untitled";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let first = DocumentId::next();
        let second = DocumentId::next();
        assert!(second > first);
        assert_ne!(first, second);
        assert!(first.to_string().starts_with("doc-"));
    }

    #[test]
    fn label_uses_file_name() {
        assert_eq!(label_for_path(Path::new("/tmp/project/main.rs")), "main.rs");
        assert_eq!(label_for_path(Path::new("/")), UNTITLED_LABEL);
    }

    #[test]
    fn display_label_marks_dirty_documents() {
        let mut doc = Document::new(
            DocumentId::next(),
            "notes.txt".into(),
            None,
            String::new(),
            "plaintext".into(),
        );
        assert_eq!(doc.display_label(), "notes.txt");
        doc.set_modified(true);
        assert_eq!(doc.display_label(), "● notes.txt");
    }
}
