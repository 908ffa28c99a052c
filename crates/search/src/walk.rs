use std::path::Path;

use inkedit_core::{DirEntry, HostFs};
use tracing::{debug, trace};

use crate::{search_text, SearchError, SearchMatch};

/// Folder names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "build", ".git", ".vscode"];

/// Extensions treated as binary; such files are never read.
pub const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".svg", ".webp", ".mp4", ".avi", ".mov",
    ".wmv", ".flv", ".mkv", ".mp3", ".wav", ".ogg", ".flac", ".aac", ".zip", ".rar", ".7z",
    ".tar", ".gz", ".bz2", ".exe", ".dll", ".so", ".dylib", ".app", ".ttf", ".otf", ".woff",
    ".woff2", ".eot", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".db",
    ".sqlite", ".bin", ".dat",
];

/// Hidden entries and well-known build, dependency and VCS folders.
pub fn should_skip_entry(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Case-insensitive extension check against [`BINARY_EXTENSIONS`].
pub fn is_binary_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Searches every text file below `root` in traversal order: each folder's
/// listing order, descending into subfolders as they are met.
///
/// Unlistable folders and unreadable files contribute no results.
pub async fn search_tree<F>(
    fs: &F,
    root: &Path,
    query: &str,
) -> Result<Vec<SearchMatch>, SearchError>
where
    F: HostFs + ?Sized,
{
    let mut results = Vec::new();
    if query.is_empty() {
        return Ok(results);
    }

    let mut stack = match list(fs, root).await {
        Some(entries) => vec![entries.into_iter()],
        None => return Ok(results),
    };
    let mut files_searched = 0usize;

    while let Some(level) = stack.last_mut() {
        let Some(entry) = level.next() else {
            stack.pop();
            continue;
        };
        if should_skip_entry(&entry.name) {
            trace!(path = %entry.path.display(), "skipping entry");
            continue;
        }
        if entry.is_dir() {
            if let Some(children) = list(fs, &entry.path).await {
                stack.push(children.into_iter());
            }
            continue;
        }
        if !entry.is_file() || is_binary_file(&entry.name) {
            continue;
        }
        let content = match fs.read_file(&entry.path).await {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %entry.path.display(), %err, "skipping unreadable file");
                continue;
            }
        };
        files_searched += 1;
        for line in search_text(&content, query)? {
            results.push(SearchMatch::from_line(entry.path.clone(), line));
        }
    }

    debug!(
        root = %root.display(),
        files_searched,
        matches = results.len(),
        "workspace search finished"
    );
    Ok(results)
}

async fn list<F>(fs: &F, path: &Path) -> Option<Vec<DirEntry>>
where
    F: HostFs + ?Sized,
{
    match fs.read_directory(path).await {
        Ok(entries) => Some(entries),
        Err(err) => {
            debug!(path = %path.display(), %err, "skipping unreadable folder");
            None
        }
    }
}
