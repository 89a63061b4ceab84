use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_APP_URL: &str = "http://localhost:8080/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root URL of the running application, used for links and the REST client.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Prepended to notification titles as `[prefix] `.
    #[serde(default)]
    pub notification_prefix: Option<String>,
    #[serde(default)]
    pub issue_tracker_enabled: bool,
    #[serde(default)]
    pub memcache_mechanism: bool,
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            notification_prefix: None,
            issue_tracker_enabled: false,
            memcache_mechanism: false,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/grc/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("grc/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("grc\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Loads the config file if present, then applies `GRC_*` environment overrides.
    pub fn load() -> Self {
        let config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring invalid config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Could not read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GRC_APP_URL").filter(|v| !v.is_empty()) {
            self.app_url = url;
        }
        if let Some(prefix) = lookup("GRC_NOTIFICATION_PREFIX") {
            self.notification_prefix = Some(prefix).filter(|p| !p.is_empty());
        }
        if let Some(flag) = lookup("GRC_ISSUE_TRACKER_ENABLED") {
            self.issue_tracker_enabled = parse_flag(&flag);
        }
        if let Some(flag) = lookup("GRC_MEMCACHE_MECHANISM") {
            self.memcache_mechanism = parse_flag(&flag);
        }
        self
    }

    /// Title prefix for generated notifications, empty when none is configured.
    pub fn notification_title_prefix(&self) -> String {
        match self.notification_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("[{}] ", prefix),
            _ => String::new(),
        }
    }

    /// App URL guaranteed to end with a slash, so relative joins keep the path.
    pub fn url_root(&self) -> String {
        if self.app_url.ends_with('/') {
            self.app_url.clone()
        } else {
            format!("{}/", self.app_url)
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.app_url, "http://localhost:8080/");
        assert!(config.notification_prefix.is_none());
        assert!(!config.issue_tracker_enabled);
        assert!(!config.memcache_mechanism);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "app_url = \"https://grc.example.com\"\nnotification_prefix = \"staging\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.app_url, "https://grc.example.com");
        assert_eq!(config.notification_prefix.as_deref(), Some("staging"));
        assert_eq!(config.url_root(), "https://grc.example.com/");
    }

    #[test]
    fn test_invalid_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "app_url = [").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.app_url, "http://localhost:8080/");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GRC_APP_URL", "http://qa:9000/"),
            ("GRC_NOTIFICATION_PREFIX", "QA"),
            ("GRC_ISSUE_TRACKER_ENABLED", "true"),
            ("GRC_MEMCACHE_MECHANISM", "0"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.app_url, "http://qa:9000/");
        assert!(config.issue_tracker_enabled);
        assert!(!config.memcache_mechanism);
        assert_eq!(config.notification_title_prefix(), "[QA] ");
    }

    #[test]
    fn test_empty_prefix_is_ignored() {
        let config = AppConfig {
            notification_prefix: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.notification_title_prefix(), "");
    }
}
