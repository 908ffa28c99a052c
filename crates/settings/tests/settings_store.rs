use inkedit_settings::{AppSettings, SettingsStore, Theme, WordWrap};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("settings.json");

    let store = SettingsStore::load(&path).expect("load defaults");
    let settings = store.settings();
    assert_eq!(settings.theme, Theme::Light);
    assert_eq!(settings.font_size, 14);
    assert_eq!(settings.tab_size, 4);
    assert_eq!(settings.word_wrap, WordWrap::Off);
    assert!(settings.minimap);
    assert!(!settings.auto_save);
    assert!(!settings.format_on_save);
    assert!(!path.exists());
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("settings.json");

    let mut store = SettingsStore::new(path.clone(), AppSettings::default());
    store
        .update(|settings| {
            settings.theme = Theme::Dark;
            settings.font_size = 18;
            settings.auto_save = true;
        })
        .expect("save");

    let reloaded = SettingsStore::load(&path).expect("reload");
    assert_eq!(reloaded.settings().theme, Theme::Dark);
    assert_eq!(reloaded.settings().font_size, 18);
    assert!(reloaded.settings().auto_save);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn partial_file_fills_defaults_and_clamps() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("settings.json");
    fs::write(&path, r#"{ "theme": "dark", "font_size": 3, "extra": 1 }"#).expect("write");

    let store = SettingsStore::load(&path).expect("load");
    assert_eq!(store.settings().theme, Theme::Dark);
    assert_eq!(store.settings().font_size, 8);
    assert_eq!(store.settings().tab_size, 4);
    assert!(store.settings().minimap);
}

#[test]
fn corrupt_file_reports_path() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("settings.json");
    fs::write(&path, "{ broken").expect("write");

    let err = SettingsStore::load(&path).expect_err("parse error");
    assert!(err.to_string().contains("settings.json"));
}

#[test]
fn toggle_and_reset_persist() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("settings.json");

    let mut store = SettingsStore::load(&path).expect("load");
    assert_eq!(store.toggle_theme().expect("toggle"), Theme::Dark);
    store.set_value("tab_size", "2").expect("set");
    assert_eq!(SettingsStore::load(&path).expect("reload").settings().tab_size, 2);

    store.reset().expect("reset");
    assert_eq!(
        SettingsStore::load(&path).expect("reload").settings(),
        &AppSettings::default()
    );
}
