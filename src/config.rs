use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Used when a request carries no bearer token of its own.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Extra or replacement model aliases.
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_url: default_base_url(),
            api_key: None,
            body_limit_bytes: default_body_limit(),
            models: BTreeMap::new(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file if one exists, then apply environment overrides.
    /// Priority: environment > CLI-given file > CWD > XDG config > home dir > defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match explicit_path {
            Some(path) => Self::load(path)?,
            None => match config_search_paths().into_iter().find(|p| p.exists()) {
                Some(candidate) => {
                    tracing::info!(path = %candidate.display(), "Loading config");
                    Self::load(&candidate)?
                }
                None => Self::default(),
            },
        };

        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `PORT`, `NIM_API_BASE` and `NIM_API_KEY` from `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            self.port = port.trim().parse().map_err(|_| {
                ProxyError::config(format!("PORT must be a valid port number, got '{port}'"))
            })?;
        }
        if let Some(base) = lookup("NIM_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.base_url = base;
        }
        if let Some(key) = lookup("NIM_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        Ok(self)
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("nim-proxy.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("nim-proxy").join("config.toml"));
    }
    if let Some(home) = dirs_path() {
        paths.push(home.join(".config").join("nim-proxy").join("config.toml"));
        paths.push(home.join(".nim-proxy.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "https://integrate.api.nvidia.com/v1");
        assert!(config.api_key.is_none());
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000
base_url = "http://localhost:8000/v1"
api_key = "nvapi-test"

[models]
"gpt-4" = "nvidia/nemotron-4-340b-instruct"
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.api_key.as_deref(), Some("nvapi-test"));
        assert_eq!(
            config.models.get("gpt-4"),
            Some(&"nvidia/nemotron-4-340b-instruct".to_string())
        );
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let config = ProxyConfig::default()
            .with_env(env(&[
                ("PORT", "8080"),
                ("NIM_API_BASE", "http://nim.internal/v1"),
                ("NIM_API_KEY", "nvapi-env"),
            ]))
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url, "http://nim.internal/v1");
        assert_eq!(config.api_key.as_deref(), Some("nvapi-env"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = ProxyConfig::default()
            .with_env(env(&[("PORT", ""), ("NIM_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let result = ProxyConfig::default().with_env(env(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ProxyError::Config { .. })));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = ProxyConfig {
            api_key: Some("secret".to_string()),
            ..ProxyConfig::default()
        };
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }
}
