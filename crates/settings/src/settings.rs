use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const FONT_SIZE_RANGE: (u32, u32) = (8, 72);
const TAB_SIZE_RANGE: (u32, u32) = (1, 16);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for setting `{key}`")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordWrap {
    On,
    #[default]
    Off,
}

impl fmt::Display for WordWrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
        })
    }
}

impl FromStr for WordWrap {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(()),
        }
    }
}

/// 編輯器設定。 / Editor preferences persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,
    #[serde(default)]
    pub word_wrap: WordWrap,
    #[serde(default = "default_true")]
    pub minimap: bool,
    #[serde(default)]
    pub auto_save: bool,
    #[serde(default)]
    pub format_on_save: bool,
}

fn default_font_size() -> u32 {
    14
}

fn default_tab_size() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_size: default_font_size(),
            tab_size: default_tab_size(),
            word_wrap: WordWrap::Off,
            minimap: true,
            auto_save: false,
            format_on_save: false,
        }
    }
}

impl AppSettings {
    /// Names accepted by [`AppSettings::set_value`], in display order.
    pub const KEYS: [&'static str; 7] = [
        "theme",
        "font_size",
        "tab_size",
        "word_wrap",
        "minimap",
        "auto_save",
        "format_on_save",
    ];

    pub fn sanitize(&mut self) {
        self.font_size = self.font_size.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1);
        self.tab_size = self.tab_size.clamp(TAB_SIZE_RANGE.0, TAB_SIZE_RANGE.1);
    }

    /// 以文字設定單一欄位。 / Parses `value` into the field named `key`; numbers are clamped.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "theme" => self.theme = value.parse().map_err(|_| invalid())?,
            "font_size" => self.font_size = value.parse().map_err(|_| invalid())?,
            "tab_size" => self.tab_size = value.parse().map_err(|_| invalid())?,
            "word_wrap" => self.word_wrap = value.parse().map_err(|_| invalid())?,
            "minimap" => self.minimap = value.parse().map_err(|_| invalid())?,
            "auto_save" => self.auto_save = value.parse().map_err(|_| invalid())?,
            "format_on_save" => self.format_on_save = value.parse().map_err(|_| invalid())?,
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        self.sanitize();
        Ok(())
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        Some(match key {
            "theme" => self.theme.to_string(),
            "font_size" => self.font_size.to_string(),
            "tab_size" => self.tab_size.to_string(),
            "word_wrap" => self.word_wrap.to_string(),
            "minimap" => self.minimap.to_string(),
            "auto_save" => self.auto_save.to_string(),
            "format_on_save" => self.format_on_save.to_string(),
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: AppSettings,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, settings: AppSettings) -> Self {
        Self {
            path: path.into(),
            data: settings,
        }
    }

    /// Missing files yield defaults; unknown or missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "settings file missing, using defaults");
            return Ok(Self {
                path,
                data: AppSettings::default(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: AppSettings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.data
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut AppSettings),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.data.set_value(key, value)?;
        self.save()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, SettingsError> {
        self.update(|settings| settings.theme = settings.theme.toggled())?;
        Ok(self.data.theme)
    }

    pub fn reset(&mut self) -> Result<(), SettingsError> {
        self.data = AppSettings::default();
        self.save()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            SettingsError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| SettingsError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_parses_and_clamps() {
        let mut settings = AppSettings::default();
        settings.set_value("font_size", "200").unwrap();
        assert_eq!(settings.font_size, 72);
        settings.set_value("tab_size", "0").unwrap();
        assert_eq!(settings.tab_size, 1);
        settings.set_value("word_wrap", "on").unwrap();
        assert_eq!(settings.word_wrap, WordWrap::On);
        settings.set_value("minimap", "false").unwrap();
        assert!(!settings.minimap);
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut settings = AppSettings::default();
        assert!(matches!(
            settings.set_value("theme", "sepia"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set_value("font", "12"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn every_key_has_a_value() {
        let settings = AppSettings::default();
        for key in AppSettings::KEYS {
            assert!(settings.value_of(key).is_some(), "{key}");
        }
        assert_eq!(settings.value_of("theme").as_deref(), Some("light"));
        assert_eq!(settings.value_of("nope"), None);
    }
}
