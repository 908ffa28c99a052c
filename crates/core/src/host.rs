use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// 主機檔案操作的錯誤。 / Errors raised by host filesystem operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("{} is not valid UTF-8 text", .0.display())]
    InvalidText(PathBuf),
}

impl HostError {
    /// 將 `io::Error` 轉為帶路徑的錯誤。 / Attaches `path` to an `io::Error`.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::InvalidData => Self::InvalidText(path),
            _ => Self::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) | Self::InvalidText(path) => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// 目錄項目的種類。 / Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// 單一目錄項目。 / One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// 目錄優先、再依名稱（不分大小寫）排序。 / Orders entries directories first, then by case-insensitive name.
pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// 宿主提供的檔案與對話框能力。 / Filesystem and dialog capability supplied by the host.
///
/// Every call is a suspension point. Implementations run on a single-threaded
/// executor, so futures are not required to be `Send`.
#[async_trait(?Send)]
pub trait HostFs {
    /// `None` when the user cancels.
    async fn open_file_dialog(&self) -> Result<Option<PathBuf>, HostError>;

    async fn open_folder_dialog(&self) -> Result<Option<PathBuf>, HostError>;

    /// `default_name` pre-fills the dialog's file name field.
    async fn save_file_dialog(&self, default_name: Option<&str>)
        -> Result<Option<PathBuf>, HostError>;

    async fn read_file(&self, path: &Path) -> Result<String, HostError>;

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError>;

    /// Entries ordered directories first, then by name.
    async fn read_directory(&self, path: &Path) -> Result<Vec<DirEntry>, HostError>;

    /// `None` when nothing exists at `path`.
    async fn entry_kind(&self, path: &Path) -> Option<EntryKind>;

    async fn exists(&self, path: &Path) -> bool {
        self.entry_kind(path).await.is_some()
    }
}

/// 以 1 為起點的游標位置。 / 1-based caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// 編輯元件發出的通知。 / Notifications emitted by a [`TextSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The text changed, whether by the user or by `set_value`.
    ContentChanged,
}

/// 編輯元件的監聽函式。 / Listener registered with [`TextSurface::subscribe`].
pub type SurfaceListener = Box<dyn FnMut(SurfaceEvent)>;

/// 單一共用的文字編輯元件。 / The single shared text editing widget.
///
/// Implementations may invoke listeners synchronously from inside `set_value`.
pub trait TextSurface {
    fn value(&self) -> String;
    fn set_value(&mut self, text: &str);
    fn set_language(&mut self, language: &str);
    fn cursor(&self) -> CursorPosition;
    fn set_cursor(&mut self, position: CursorPosition);
    fn reveal_line(&mut self, line: usize);
    fn layout(&mut self);
    fn focus(&mut self);
    fn dispose(&mut self);
    fn subscribe(&mut self, listener: SurfaceListener);
}
