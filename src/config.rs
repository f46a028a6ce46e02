use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base URL of the hosted backend project. Absent means guest-only
    /// mode: no sign-in and no text reader.
    pub backend_url: Option<String>,
    /// The project's public (anon) API key.
    pub backend_api_key: Option<String>,

    #[serde(default = "default_version")]
    pub default_version: String,
}

fn default_data_dir() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verse-tracker");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.to_string_lossy().to_string()
}

fn default_version() -> String {
    "kjv".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend_url: None,
            backend_api_key: None,
            default_version: default_version(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| AppError::Config(e.to_string()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("verse-tracker")
            .join("config.toml")
    }

    /// Backend URL and key together, parsed and validated, if configured.
    pub fn backend(&self) -> Result<Option<(url::Url, String)>> {
        match (&self.backend_url, &self.backend_api_key) {
            (Some(url), Some(key)) => {
                let parsed = url::Url::parse(url)
                    .map_err(|e| AppError::Config(format!("invalid backend_url: {e}")))?;
                Ok(Some((parsed, key.clone())))
            }
            (None, None) => Ok(None),
            _ => Err(AppError::Config(
                "backend_url and backend_api_key must be set together".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_requires_both_fields() {
        let mut config = Config::default();
        assert!(config.backend().unwrap().is_none());

        config.backend_url = Some("https://example.supabase.co".to_string());
        assert!(config.backend().is_err());

        config.backend_api_key = Some("anon".to_string());
        let (url, key) = config.backend().unwrap().unwrap();
        assert_eq!(url.host_str(), Some("example.supabase.co"));
        assert_eq!(key, "anon");
    }

    #[test]
    fn invalid_backend_url_is_a_config_error() {
        let config = Config {
            backend_url: Some("not a url".to_string()),
            backend_api_key: Some("anon".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.backend(), Err(AppError::Config(_))));
    }
}
