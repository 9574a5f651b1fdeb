//! Configuration file parser for ~/.config/feedsniff/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they are
//! usually typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::sniffer::DEFAULT_SNIFF_LIMIT;
use crate::feed::{DEFAULT_TIMEOUT, MAX_FEED_SIZE};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Fetch and sniffing settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks `auth_token` so it never reaches logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    /// Largest response body accepted, in bytes.
    pub max_feed_size: usize,

    /// How many body bytes content sniffing may inspect.
    pub sniff_limit: usize,

    /// Allow URLs resolving to localhost or private networks (intranet feeds).
    pub allow_private_hosts: bool,

    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,

    /// Bearer token for authenticated feeds.
    /// `FEEDSNIFF_AUTH_TOKEN` takes precedence when set.
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: concat!("feedsniff/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_feed_size: MAX_FEED_SIZE,
            sniff_limit: DEFAULT_SNIFF_LIMIT,
            allow_private_hosts: false,
            headers: HashMap::new(),
            auth_token: None,
        }
    }
}

/// SEC-015: Mask auth_token in Debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_feed_size", &self.max_feed_size)
            .field("sniff_limit", &self.sniff_limit)
            .field("allow_private_hosts", &self.allow_private_hosts)
            .field("headers", &self.headers)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "user_agent",
        "timeout_secs",
        "max_feed_size",
        "sniff_limit",
        "allow_private_hosts",
        "headers",
        "auth_token",
    ];

    /// Default config location: `$HOME/.config/feedsniff/config.toml`.
    ///
    /// Returns `None` when `HOME` is unset.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("feedsniff")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content).inspect(|config| {
            tracing::info!(
                path = %path.display(),
                timeout_secs = config.timeout_secs,
                allow_private_hosts = config.allow_private_hosts,
                "Loaded configuration"
            );
        })
    }

    /// Parses config text; blank input yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    /// Overrides `auth_token` from `FEEDSNIFF_AUTH_TOKEN` when that is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(token) = std::env::var("FEEDSNIFF_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
        {
            self.auth_token = Some(token);
        }
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("feedsniff_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user_agent.starts_with("feedsniff/"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_feed_size, 10 * 1024 * 1024);
        assert_eq!(config.sniff_limit, 64 * 1024);
        assert!(!config.allow_private_hosts);
        assert!(config.headers.is_empty());
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedsniff_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_empty_and_whitespace_files_return_default() {
        for (name, content) in [("empty", ""), ("whitespace", "   \n  \n  ")] {
            let (dir, path) = write_config(name, content);
            let config = Config::load(&path).unwrap();
            assert_eq!(config.sniff_limit, DEFAULT_SNIFF_LIMIT);
            std::fs::remove_dir_all(&dir).ok();
        }
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "timeout_secs = 5\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_feed_size, MAX_FEED_SIZE); // default
        assert!(!config.allow_private_hosts); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
user_agent = "my-reader/2.0"
timeout_secs = 10
max_feed_size = 1048576
sniff_limit = 4096
allow_private_hosts = true
auth_token = "test-token-123"

[headers]
Accept-Language = "en"
X-Client = "feedsniff"
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_agent, "my-reader/2.0");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_feed_size, 1_048_576);
        assert_eq!(config.sniff_limit, 4096);
        assert!(config.allow_private_hosts);
        assert_eq!(config.auth_token.as_deref(), Some("test-token-123"));
        assert_eq!(
            config.headers.get("Accept-Language").map(String::as_str),
            Some("en")
        );
        assert_eq!(config.headers.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("timeout_secs = 7\ntotally_fake_key = \"x\"\n").unwrap();
        assert_eq!(config.timeout_secs, 7);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        // timeout_secs should be an integer
        let result = Config::parse("timeout_secs = \"soon\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    // SEC-015: Debug output masks the token
    #[test]
    fn test_debug_masks_auth_token() {
        let config = Config {
            auth_token: Some("super-secret-token-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token-12345"));
        assert!(debug_output.contains("[REDACTED]"));

        let debug_output = format!("{:?}", Config::default());
        assert!(!debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_default_path_under_config_dir() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with(".config/feedsniff/config.toml"));
        }
    }
}
