// Application settings
// Loaded from ~/.config/rostermerge/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding `api.baseUrl`.
pub const API_BASE_URL_ENV: &str = "ROSTERMERGE_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the upload + merge service (no trailing `/merge/`)
    #[serde(rename = "api.baseUrl")]
    pub api_base_url: String,

    /// Request timeout in seconds, None = wait indefinitely
    #[serde(rename = "api.timeoutSecs")]
    pub api_timeout_secs: Option<u64>,

    /// Session store directory, None = platform state dir
    #[serde(rename = "session.dir")]
    pub session_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout_secs: None,
            session_dir: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rostermerge")
            .join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file yields defaults; a broken
    /// file is reported and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Effective base URL: explicit override, then env var, then file value.
    /// Trailing slashes are trimmed so paths can be appended verbatim.
    pub fn resolve_api_base(&self, explicit: Option<&str>) -> String {
        let from_env = std::env::var(API_BASE_URL_ENV).ok().filter(|s| !s.trim().is_empty());
        let chosen = explicit
            .map(str::to_string)
            .or(from_env)
            .unwrap_or_else(|| self.api_base_url.clone());
        chosen.trim().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.api_base_url, DEFAULT_API_BASE_URL);
        assert!(s.api_timeout_secs.is_none());
        assert!(s.session_dir.is_none());
    }

    #[test]
    fn test_parse_with_comments_and_partial_keys() {
        let json = r#"{
    // Remote merge service
    "api.baseUrl": "https://merge.example.org/",
    "api.timeoutSecs": 120
}"#;
        let s = Settings::parse(json).unwrap();
        assert_eq!(s.api_base_url, "https://merge.example.org/");
        assert_eq!(s.api_timeout_secs, Some(120));
        assert!(s.session_dir.is_none());
    }

    #[test]
    fn test_load_from_missing_and_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());

        let broken = dir.path().join("settings.json");
        std::fs::write(&broken, "{ \"api.baseUrl\": ").unwrap();
        assert_eq!(Settings::load_from(&broken), Settings::default());
    }

    #[test]
    fn test_explicit_base_wins_and_is_trimmed() {
        let s = Settings::default();
        assert_eq!(
            s.resolve_api_base(Some("http://10.0.0.5:9000/")),
            "http://10.0.0.5:9000"
        );
    }
}
