use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::Language;

const ENV_URL: &str = "PROMPT_CATALOG_URL";
const ENV_LANG: &str = "PROMPT_CATALOG_LANG";

/// Runtime settings, read from `config.json` in the platform config directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server hosting the `/catalog/*` endpoints.
    pub base_url: String,
    pub default_language: Language,
    pub search_debounce_ms: u64,
    /// Name of the host text field templates are applied to.
    pub prompt_field: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8188".to_string(),
            default_language: Language::Zh,
            search_debounce_ms: 300,
            prompt_field: "prompt".to_string(),
            user_agent: "prompt-catalog".to_string(),
        }
    }
}

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "prompt-catalog", "prompt-catalog")
        .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
}

impl Config {
    /// Loads the config file if there is one, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = project_dirs()?.config_dir().join("config.json");
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Unknown language codes in the environment are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(lang) = lookup(ENV_LANG).as_deref().and_then(Language::parse) {
            self.default_language = lang;
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config = Config::from_json(r#"{"default_language": "en"}"#).expect("valid");
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.base_url, "http://127.0.0.1:8188");
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn malformed_files_are_errors() {
        assert!(Config::from_json(r#"{"search_debounce_ms": "soon"}"#).is_err());
    }

    #[test]
    fn environment_overrides_the_file() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENV_URL => Some("http://catalog.local:9000".into()),
            ENV_LANG => Some("EN".into()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://catalog.local:9000");
        assert_eq!(config.default_language, Language::En);

        config.apply_env(|key| (key == ENV_LANG).then(|| "fr".to_string()));
        assert_eq!(config.default_language, Language::En);
    }
}
