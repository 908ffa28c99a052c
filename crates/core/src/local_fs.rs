use std::cell::RefCell;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, trace};

use crate::host::{sort_entries, DirEntry, EntryKind, HostError, HostFs};

/// 無互動環境下預先設定的對話框回覆。 / Pre-set dialog answers for hosts without interactive dialogs.
///
/// Each answer is consumed by the first dialog of its kind; later calls behave
/// as if the user cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogAnswers {
    pub open_file: Option<PathBuf>,
    pub open_folder: Option<PathBuf>,
    pub save_file: Option<PathBuf>,
}

/// 以 tokio 實作的本機檔案系統。 / [`HostFs`] backed by the local filesystem through `tokio::fs`.
#[derive(Debug, Default)]
pub struct LocalHostFs {
    answers: RefCell<DialogAnswers>,
}

impl LocalHostFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: DialogAnswers) -> Self {
        Self {
            answers: RefCell::new(answers),
        }
    }
}

#[async_trait(?Send)]
impl HostFs for LocalHostFs {
    async fn open_file_dialog(&self) -> Result<Option<PathBuf>, HostError> {
        Ok(self.answers.borrow_mut().open_file.take())
    }

    async fn open_folder_dialog(&self) -> Result<Option<PathBuf>, HostError> {
        Ok(self.answers.borrow_mut().open_folder.take())
    }

    async fn save_file_dialog(
        &self,
        default_name: Option<&str>,
    ) -> Result<Option<PathBuf>, HostError> {
        trace!(?default_name, "save dialog requested");
        Ok(self.answers.borrow_mut().save_file.take())
    }

    async fn read_file(&self, path: &Path) -> Result<String, HostError> {
        let bytes = fs::read(path)
            .await
            .map_err(|err| HostError::from_io(path, err))?;
        String::from_utf8(bytes).map_err(|_| HostError::InvalidText(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        write_atomic(path, content.as_bytes())
            .await
            .map_err(|err| HostError::from_io(path, err))?;
        debug!(path = %path.display(), bytes = content.len(), "file written");
        Ok(())
    }

    async fn read_directory(&self, path: &Path) -> Result<Vec<DirEntry>, HostError> {
        let mut reader = fs::read_dir(path)
            .await
            .map_err(|err| HostError::from_io(path, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| HostError::from_io(path, err))?
        {
            let kind = match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => EntryKind::Directory,
                Ok(file_type) if file_type.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Other,
                Err(err) => {
                    trace!(path = %entry.path().display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                kind,
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let metadata = fs::metadata(path).await.ok()?;
        Some(if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, data).await?;
    fs::rename(&tmp_path, path).await
}
