use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const SETTINGS_FILE: &str = "melanoma_client.toml";
const DATA_DIR_NAME: &str = ".melanoma_client";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid API base url '{value}': {source}")]
    InvalidApiUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("API base url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("settings file '{}' is not valid TOML: {source}", path.display())]
    MalformedFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base: Url,
    pub token_path: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_path: default_token_path(),
        }
    }
}

fn default_api_base() -> Url {
    match Url::parse(DEFAULT_API_URL) {
        Ok(url) => url,
        Err(err) => unreachable!("default api url is valid: {err}"),
    }
}

fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join(SESSION_FILE_NAME)
}

pub fn parse_api_base(value: &str) -> Result<Url, SettingsError> {
    let value = value.trim();
    let url = Url::parse(value).map_err(|source| SettingsError::InvalidApiUrl {
        value: value.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SettingsError::UnsupportedScheme(value.to_string()));
    }
    Ok(url)
}

/// Defaults, then `melanoma_client.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let file = match fs::read_to_string(SETTINGS_FILE) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {SETTINGS_FILE}"));
        }
    };
    let settings = settings_from_sources(Path::new(SETTINGS_FILE), file.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    info!(
        api_base = %settings.api_base,
        token_path = %settings.token_path.display(),
        "client settings loaded"
    );
    Ok(settings)
}

pub fn settings_from_sources(
    file_path: &Path,
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, SettingsError> {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file {
        let file_cfg = toml::from_str::<HashMap<String, String>>(raw).map_err(|source| {
            SettingsError::MalformedFile {
                path: file_path.to_path_buf(),
                source,
            }
        })?;
        if let Some(v) = file_cfg.get("api_url") {
            settings.api_base = parse_api_base(v)?;
        }
        if let Some(v) = file_cfg.get("token_path") {
            settings.token_path = PathBuf::from(v);
        }
    }

    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("MELANOMA_API_URL") {
        settings.api_base = parse_api_base(&v)?;
    }
    if let Some(v) = non_empty("APP__API_URL") {
        settings.api_base = parse_api_base(&v)?;
    }

    if let Some(v) = non_empty("MELANOMA_TOKEN_PATH") {
        settings.token_path = PathBuf::from(v);
    }
    if let Some(v) = non_empty("APP__TOKEN_PATH") {
        settings.token_path = PathBuf::from(v);
    }

    debug!(?settings, "resolved settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_loopback_api() {
        let settings = settings_from_sources(Path::new("x.toml"), None, no_env).expect("settings");
        assert_eq!(settings.api_base.as_str(), "http://127.0.0.1:8000/");
        assert!(settings.token_path.ends_with(".melanoma_client/session.json"));
    }

    #[test]
    fn environment_overrides_file() {
        let file = "api_url = \"http://10.0.0.5:9000\"\ntoken_path = \"/tmp/from-file.json\"\n";
        let from_file =
            settings_from_sources(Path::new("x.toml"), Some(file), no_env).expect("file");
        assert_eq!(from_file.api_base.as_str(), "http://10.0.0.5:9000/");
        assert_eq!(from_file.token_path, PathBuf::from("/tmp/from-file.json"));

        let env = |key: &str| match key {
            "MELANOMA_API_URL" => Some("https://predict.example.org/api".to_string()),
            "APP__TOKEN_PATH" => Some("/tmp/from-env.json".to_string()),
            "MELANOMA_TOKEN_PATH" => Some("   ".to_string()),
            _ => None,
        };
        let merged = settings_from_sources(Path::new("x.toml"), Some(file), env).expect("env");
        assert_eq!(merged.api_base.as_str(), "https://predict.example.org/api");
        assert_eq!(merged.token_path, PathBuf::from("/tmp/from-env.json"));
    }

    #[test]
    fn rejects_unusable_api_urls() {
        assert!(matches!(
            parse_api_base("not a url"),
            Err(SettingsError::InvalidApiUrl { .. })
        ));
        assert!(matches!(
            parse_api_base("ftp://127.0.0.1"),
            Err(SettingsError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            settings_from_sources(Path::new("x.toml"), Some("api_url = ["), no_env),
            Err(SettingsError::MalformedFile { .. })
        ));
    }
}
