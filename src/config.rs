//! Configuration loading.
//!
//! Settings come from an optional TOML file (default `./config/pagewise.toml`).
//! The backend origin can be overridden by the `PAGEWISE_BACKEND_URL`
//! environment variable and then by the `--backend` CLI flag; the result is
//! resolved once at startup and never re-read.
//!
//! ```toml
//! [backend]
//! url = "http://127.0.0.1:5040"
//!
//! [timeouts]
//! default_ms = 60000
//! summarize_ms = 120000
//! ask_ms = 60000
//!
//! [document]
//! preview_chars = 1000
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `backend.url`.
pub const BACKEND_URL_ENV: &str = "PAGEWISE_BACKEND_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:5040".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_ms: u64,
    #[serde(default = "default_summarize_ms")]
    pub summarize_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub ask_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: default_timeout_ms(),
            summarize_ms: default_summarize_ms(),
            ask_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    60_000
}
fn default_summarize_ms() -> u64 {
    120_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    /// Characters of raw text shown after a local file is loaded.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_preview_chars() -> usize {
    1000
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.default_ms)
    }

    pub fn summarize_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.summarize_ms)
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.ask_ms)
    }

    /// Replace the backend origin when an override is present.
    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend.url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.backend.url)
            .with_context(|| format!("backend.url is not a valid URL: {}", self.backend.url))?;
        match url.scheme() {
            "http" | "https" => {}
            other => bail!("backend.url must use http or https, got '{}'", other),
        }

        if self.timeouts.default_ms == 0 {
            bail!("timeouts.default_ms must be > 0");
        }
        if self.timeouts.summarize_ms == 0 {
            bail!("timeouts.summarize_ms must be > 0");
        }
        if self.timeouts.ask_ms == 0 {
            bail!("timeouts.ask_ms must be > 0");
        }

        Ok(())
    }
}

/// Read and validate a config file. No overrides are applied.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Resolve the effective configuration for this process.
///
/// A missing file falls back to [`Config::minimal`]; a file that exists but
/// does not parse is an error. Precedence for the backend origin is
/// `cli_backend` > `PAGEWISE_BACKEND_URL` > file > default.
pub fn resolve_config(path: &Path, cli_backend: Option<String>) -> Result<Config> {
    let config = if path.exists() {
        load_config(path)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    let config = config
        .with_backend_url(std::env::var(BACKEND_URL_ENV).ok())
        .with_backend_url(cli_backend);
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pagewise.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_minimal_defaults() {
        let cfg = Config::minimal();
        assert_eq!(cfg.backend.url, "http://127.0.0.1:5040");
        assert_eq!(cfg.default_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.summarize_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.ask_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.document.preview_chars, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[backend]\nurl = \"https://qa.example.com\"\n\n[timeouts]\nsummarize_ms = 300000\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.backend.url, "https://qa.example.com");
        assert_eq!(cfg.timeouts.summarize_ms, 300_000);
        assert_eq!(cfg.timeouts.default_ms, 60_000);
        assert_eq!(cfg.timeouts.ask_ms, 60_000);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[timeouts]\nask_ms = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("ask_ms"));
    }

    #[test]
    fn test_load_rejects_non_http_scheme() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[backend]\nurl = \"ftp://example.com\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[backend\nurl = ");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_resolve_missing_file_uses_defaults_and_cli_override() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let cfg = resolve_config(&missing, Some("http://10.0.0.5:9000".to_string())).unwrap();
        assert_eq!(cfg.backend.url, "http://10.0.0.5:9000");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let cfg = Config::minimal().with_backend_url(Some("   ".to_string()));
        assert_eq!(cfg.backend.url, "http://127.0.0.1:5040");
    }
}
