use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;
use crate::taxonomy::DEFAULT_EUTILS_URL;
use crate::url_check::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::vocabulary::{DEFAULT_VOCABULARY_URL, Fallback};

pub const SETTINGS_FILE: &str = "atlas-fetch.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub eutils_url: Option<String>,
    #[serde(default)]
    pub vocabulary_url: Option<String>,
    #[serde(default)]
    pub vocabulary_fallback_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub url_timeout_secs: Option<u64>,
    #[serde(default)]
    pub url_retries: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub eutils_url: String,
    pub vocabulary_url: String,
    pub vocabulary_fallback: Fallback,
    pub url_timeout: Duration,
    pub url_retries: u32,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            eutils_url: DEFAULT_EUTILS_URL.to_string(),
            vocabulary_url: DEFAULT_VOCABULARY_URL.to_string(),
            vocabulary_fallback: Fallback::Bundled,
            url_timeout: DEFAULT_TIMEOUT,
            url_retries: DEFAULT_RETRIES,
        }
    }
}

pub struct SettingsLoader;

impl SettingsLoader {
    /// Reads settings from `path`, or from `atlas-fetch.json` in the current
    /// directory, or from the user config directory, in that order. Only an
    /// explicit path has to exist; otherwise defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedSettings, ValidatorError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            return Ok(ResolvedSettings::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ValidatorError::SettingsRead(config_path.clone()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|err| ValidatorError::SettingsParse(err.to_string()))?;
        Self::resolve_settings(settings)
    }

    pub fn resolve_settings(settings: Settings) -> Result<ResolvedSettings, ValidatorError> {
        if settings.url_timeout_secs == Some(0) {
            return Err(ValidatorError::SettingsParse(
                "url_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(ResolvedSettings {
            eutils_url: settings
                .eutils_url
                .unwrap_or_else(|| DEFAULT_EUTILS_URL.to_string()),
            vocabulary_url: settings
                .vocabulary_url
                .unwrap_or_else(|| DEFAULT_VOCABULARY_URL.to_string()),
            vocabulary_fallback: settings
                .vocabulary_fallback_path
                .map(Fallback::File)
                .unwrap_or(Fallback::Bundled),
            url_timeout: settings
                .url_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            url_retries: settings.url_retries.unwrap_or(DEFAULT_RETRIES),
        })
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(SETTINGS_FILE);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .and_then(|dirs| {
                let path = dirs.config_dir().join("atlas-fetch").join(SETTINGS_FILE);
                Utf8PathBuf::from_path_buf(path).ok()
            })
            .filter(|path| path.exists())
    }
}
