use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::DEFAULT_MODEL;
use crate::ocr::OCR_LANGUAGES;
use crate::translate::DEFAULT_ENDPOINT;

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub ocr_languages: String,
    pub whisper_model: String,
    pub history_path: Option<PathBuf>,
    pub user: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ocr_languages: OCR_LANGUAGES.to_string(),
            whisper_model: DEFAULT_MODEL.to_string(),
            history_path: None,
            user: "local".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    translate: Option<TranslateSettings>,
    ocr: Option<OcrSettings>,
    whisper: Option<WhisperSettings>,
    history: Option<HistorySettings>,
    system: Option<SystemSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WhisperSettings {
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HistorySettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    user: Option<String>,
}

/// Loads layered settings: the working directory's `settings.toml` and
/// `settings.local.toml`, then `~/.anuvaad/settings.toml`, then an explicit
/// extra file. Later files win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join(".anuvaad").join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| home.trim().to_string())
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

impl Settings {
    fn merge(&mut self, file: SettingsFile) {
        if let Some(translate) = file.translate {
            if let Some(endpoint) = translate.endpoint {
                self.endpoint = endpoint;
            }
        }
        if let Some(ocr) = file.ocr {
            if let Some(languages) = ocr.languages {
                self.ocr_languages = languages;
            }
        }
        if let Some(whisper) = file.whisper {
            if let Some(model) = whisper.model {
                self.whisper_model = model;
            }
        }
        if let Some(history) = file.history {
            if history.path.is_some() {
                self.history_path = history.path;
            }
        }
        if let Some(system) = file.system {
            if let Some(user) = system.user {
                self.user = user;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_settings, Settings, SettingsFile};

    #[test]
    fn defaults_cover_every_field() {
        let settings = Settings::default();
        assert!(settings.endpoint.starts_with("https://"));
        assert!(settings.ocr_languages.contains("hin"));
        assert_eq!(settings.whisper_model, "tiny");
        assert!(settings.history_path.is_none());
    }

    #[test]
    fn merge_overrides_only_present_keys() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(
            r#"
            [whisper]
            model = "base"

            [system]
            user = "asha"
            "#,
        )
        .unwrap();
        settings.merge(parsed);
        assert_eq!(settings.whisper_model, "base");
        assert_eq!(settings.user, "asha");
        // untouched
        assert!(settings.ocr_languages.contains("eng"));
    }

    #[test]
    fn explicit_settings_file_must_exist() {
        let missing = std::path::Path::new("/definitely/not/here.toml");
        assert!(load_settings(Some(missing)).is_err());
    }

    #[test]
    fn reads_an_explicit_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.toml");
        std::fs::write(
            &path,
            "[translate]\nendpoint = \"http://localhost:9999/get\"\n",
        )
        .unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.endpoint, "http://localhost:9999/get");
    }
}
