pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppSettings, SettingsError, SettingsStore, Theme, WordWrap};
