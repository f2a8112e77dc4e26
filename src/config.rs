//! Layered settings.
//!
//! Sources are applied in the order they were added and later sources win:
//! the usual chain is `appsettings.json`, then `appsettings.local.json`, then
//! the process environment (which includes anything `dotenvy` loaded).
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const SETTINGS_FILE: &str = "appsettings.json";
pub const LOCAL_SETTINGS_FILE: &str = "appsettings.local.json";

pub const PROJECT_KEY: &str = "PROJECT_KEY";
pub const PROJECT_ENDPOINT: &str = "PROJECT_ENDPOINT";
pub const DEPLOYMENT_NAME: &str = "DEPLOYMENT_NAME";
pub const SYSTEM_PROMPT: &str = "SYSTEM_PROMPT";

const KEYS: [&str; 4] = [PROJECT_KEY, PROJECT_ENDPOINT, DEPLOYMENT_NAME, SYSTEM_PROMPT];

/// Everything needed to reach the chat completion service.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    /// Optional preamble for the agent.
    pub system_prompt: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// The standard chain: required `appsettings.json`, optional
    /// `appsettings.local.json` (both in `dir`), then the environment.
    pub fn load<P>(dir: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        Self::builder()
            .json_file(dir.join(SETTINGS_FILE))
            .optional_json_file(dir.join(LOCAL_SETTINGS_FILE))
            .env()
            .build()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(rename = "PROJECT_KEY")]
    project_key: Option<String>,
    #[serde(rename = "PROJECT_ENDPOINT")]
    project_endpoint: Option<String>,
    #[serde(rename = "DEPLOYMENT_NAME")]
    deployment_name: Option<String>,
    #[serde(rename = "SYSTEM_PROMPT")]
    system_prompt: Option<String>,
}

impl RawSettings {
    fn set(&mut self, key: &str, value: String) {
        match key {
            PROJECT_KEY => self.project_key = Some(value),
            PROJECT_ENDPOINT => self.project_endpoint = Some(value),
            DEPLOYMENT_NAME => self.deployment_name = Some(value),
            SYSTEM_PROMPT => self.system_prompt = Some(value),
            _ => tracing::warn!("Ignoring unknown setting `{key}`"),
        }
    }

    fn overlay(&mut self, other: RawSettings) {
        if other.project_key.is_some() {
            self.project_key = other.project_key;
        }
        if other.project_endpoint.is_some() {
            self.project_endpoint = other.project_endpoint;
        }
        if other.deployment_name.is_some() {
            self.deployment_name = other.deployment_name;
        }
        if other.system_prompt.is_some() {
            self.system_prompt = other.system_prompt;
        }
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

enum Source {
    File { path: PathBuf, optional: bool },
    Env(EnvLookup),
    Value { key: String, value: String },
}

/// Collects settings sources; nothing is read until [`SettingsBuilder::build`].
#[derive(Default)]
pub struct SettingsBuilder {
    sources: Vec<Source>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A JSON file that must exist.
    pub fn json_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.sources.push(Source::File {
            path: path.into(),
            optional: false,
        });
        self
    }

    /// A JSON file that is skipped when it does not exist.
    pub fn optional_json_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.sources.push(Source::File {
            path: path.into(),
            optional: true,
        });
        self
    }

    /// Process environment variables named like the setting keys.
    pub fn env(self) -> Self {
        self.env_from(|key| std::env::var(key).ok())
    }

    /// Environment-style lookup through a custom function.
    pub fn env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.sources.push(Source::Env(Box::new(lookup)));
        self
    }

    /// A single explicit value.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.sources.push(Source::Value {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        let mut raw = RawSettings::default();

        for source in self.sources {
            match source {
                Source::File { path, optional } => {
                    if optional && !path.exists() {
                        tracing::debug!("Skipping missing settings file {}", path.display());
                        continue;
                    }
                    raw.overlay(read_json(&path)?);
                }
                Source::Env(lookup) => {
                    for key in KEYS {
                        if let Some(value) = lookup(key) {
                            raw.set(key, value);
                        }
                    }
                }
                Source::Value { key, value } => raw.set(&key, value),
            }
        }

        let api_key = required(PROJECT_KEY, raw.project_key)?;
        let endpoint = required(PROJECT_ENDPOINT, raw.project_endpoint)?;
        let deployment = required(DEPLOYMENT_NAME, raw.deployment_name)?;

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        let system_prompt = raw.system_prompt.filter(|s| !s.trim().is_empty());

        tracing::info!(%endpoint, %deployment, "Loaded settings");

        Ok(Settings {
            api_key,
            endpoint,
            deployment,
            system_prompt,
        })
    }
}

fn read_json(path: &Path) -> Result<RawSettings, ConfigError> {
    let str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&str).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn required(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn local_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            SETTINGS_FILE,
            r#"{"PROJECT_KEY": "", "PROJECT_ENDPOINT": "https://example.openai.azure.com/", "DEPLOYMENT_NAME": "gpt-4o"}"#,
        );
        write(dir.path(), LOCAL_SETTINGS_FILE, r#"{"PROJECT_KEY": "secret"}"#);

        let settings = Settings::builder()
            .json_file(dir.path().join(SETTINGS_FILE))
            .optional_json_file(dir.path().join(LOCAL_SETTINGS_FILE))
            .build()
            .unwrap();

        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.endpoint, "https://example.openai.azure.com/");
        assert_eq!(settings.deployment, "gpt-4o");
        assert_eq!(settings.system_prompt, None);
    }

    #[test]
    fn missing_optional_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::builder()
            .optional_json_file(dir.path().join(LOCAL_SETTINGS_FILE))
            .set(PROJECT_KEY, "k")
            .set(PROJECT_ENDPOINT, "http://localhost:8080")
            .set(DEPLOYMENT_NAME, "d")
            .build()
            .unwrap();
        assert_eq!(settings.deployment, "d");
    }

    #[test]
    fn missing_required_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), SETTINGS_FILE, "{ not json");
        let err = Settings::builder().json_file(path).build().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn environment_wins_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            SETTINGS_FILE,
            r#"{"PROJECT_KEY": "file", "PROJECT_ENDPOINT": "https://a.example", "DEPLOYMENT_NAME": "file-model"}"#,
        );
        let env: HashMap<&str, &str> =
            HashMap::from([(DEPLOYMENT_NAME, "env-model"), (SYSTEM_PROMPT, "Be brief.")]);

        let settings = Settings::builder()
            .json_file(path)
            .env_from(move |key| env.get(key).map(|v| v.to_string()))
            .build()
            .unwrap();

        assert_eq!(settings.api_key, "file");
        assert_eq!(settings.deployment, "env-model");
        assert_eq!(settings.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn empty_api_key_fails_fast() {
        let err = Settings::builder()
            .set(PROJECT_KEY, "   ")
            .set(PROJECT_ENDPOINT, "https://a.example")
            .set(DEPLOYMENT_NAME, "d")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(PROJECT_KEY)));

        let err = Settings::builder()
            .set(PROJECT_KEY, "k")
            .set(PROJECT_ENDPOINT, "https://a.example")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(DEPLOYMENT_NAME)));
    }

    #[test]
    fn endpoint_must_be_http() {
        let err = Settings::builder()
            .set(PROJECT_KEY, "k")
            .set(PROJECT_ENDPOINT, "example.openai.azure.com")
            .set(DEPLOYMENT_NAME, "d")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let settings = Settings::builder()
            .set(PROJECT_KEY, "super-secret")
            .set(PROJECT_ENDPOINT, "https://a.example")
            .set(DEPLOYMENT_NAME, "d")
            .build()
            .unwrap();
        assert!(!format!("{settings:?}").contains("super-secret"));
    }
}
