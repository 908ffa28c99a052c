use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "inkedit";
const SESSION_FILE: &str = "session.json";
const SETTINGS_FILE: &str = "settings.json";

/// 設定檔所在位置。 / Where InkEdit keeps its session and settings files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Uses `explicit` when given, otherwise the platform config directory
    /// (falling back to the working directory when the platform has none).
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::new(dir);
        }
        let base = dirs::config_dir()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join(SESSION_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let paths = AppPaths::resolve(Some(Path::new("/tmp/inkedit-test")));
        assert_eq!(paths.session_file(), Path::new("/tmp/inkedit-test/session.json"));
        assert_eq!(paths.settings_file(), Path::new("/tmp/inkedit-test/settings.json"));
    }

    #[test]
    fn default_directory_is_namespaced() {
        let paths = AppPaths::resolve(None);
        assert!(paths.config_dir().ends_with(APP_DIR));
    }
}
