//! Persistent defaults read from `config.toml`.
//!
//! Command line flags always win over values from the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_path: PathBuf,
    pub threads: usize,
    pub retry: u32,
    pub timeout_secs: u64,
    pub file_name_length: usize,
    pub caption: bool,
    pub cookie: Option<String>,
    pub user_agent: Option<String>,
    pub ffmpeg: Option<PathBuf>,
    /// Proxy url with its scheme, e.g. `socks5://127.0.0.1:1080`.
    pub proxy: Option<String>,
    /// Ranged request size for single files, in MiB. `0` disables chunking.
    pub chunk_size_mb: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("."),
            threads: 10,
            retry: 10,
            timeout_secs: 30,
            file_name_length: 255,
            caption: false,
            cookie: None,
            user_agent: None,
            ffmpeg: None,
            proxy: None,
            chunk_size_mb: 0,
        }
    }
}

impl AppConfig {
    /// `<config dir>/reel/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reel").join("config.toml"))
    }

    /// Loads `path`, or the default location when `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(AppError::io(path, e)),
        };

        let config = Self::parse(&content)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::parse("threads = 4\noutput_path = \"/media/downloads\"\n").unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.output_path, PathBuf::from("/media/downloads"));
        assert_eq!(config.retry, 10);
        assert_eq!(config.cookie, None);
        assert_eq!(config.chunk_size_mb, 0);
    }

    #[test]
    fn test_network_settings() {
        let config =
            AppConfig::parse("proxy = \"socks5://127.0.0.1:1080\"\nchunk_size_mb = 10\n").unwrap();
        assert_eq!(config.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.chunk_size_mb, 10);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_value() {
        assert!(AppConfig::parse("threads = \"many\"").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "caption = true\nffmpeg = \"/opt/ffmpeg\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.caption);
        assert_eq!(config.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = AppConfig::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "threads = [").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(AppError::Config(_))
        ));
    }
}
