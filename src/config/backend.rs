//! Pluggable config-file readers.
//!
//! # Responsibilities
//! - Read a single string or integer value by section and key
//! - Distinguish "not found" from "file unreadable / malformed"
//! - Pick a reader from the file extension
//!
//! # Design Decisions
//! - Every lookup re-reads the file; values are read a handful of times at startup only
//! - Section names match ASCII-case-insensitively so `cloud` and `Cloud` are the same section
//! - Key names match exactly

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::json::JsonBackend;
use crate::config::keyfile::KeyFileBackend;

/// Error type for config backends.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid JSON document: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is not a valid key file: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    #[error("{section}.{key} in {} must be {expected}", path.display())]
    WrongType {
        path: PathBuf,
        section: String,
        key: String,
        expected: &'static str,
    },
}

/// Reads individual values out of a configuration file.
///
/// `Ok(None)` means the section or key does not exist. Errors are reserved
/// for files that cannot be read or parsed, and for values of the wrong type.
pub trait ConfigBackend {
    fn read_string(&self, path: &Path, section: &str, key: &str)
        -> Result<Option<String>, ConfigError>;

    fn read_int(&self, path: &Path, section: &str, key: &str) -> Result<Option<i64>, ConfigError>;
}

/// On-disk layout of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `{"cloud": {"uuid": ..., "serverName": ..., "port": ...}}`
    Json,
    /// `[Cloud]` section with `uuid`, `serverName` and `port` keys.
    KeyFile,
}

impl ConfigFormat {
    /// `.json` files are JSON documents, everything else is a key file.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::KeyFile,
        }
    }
}

/// Backend that dispatches to the JSON or key-file reader per path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoBackend;

impl ConfigBackend for AutoBackend {
    fn read_string(
        &self,
        path: &Path,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        match ConfigFormat::from_path(path) {
            ConfigFormat::Json => JsonBackend.read_string(path, section, key),
            ConfigFormat::KeyFile => KeyFileBackend.read_string(path, section, key),
        }
    }

    fn read_int(&self, path: &Path, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        match ConfigFormat::from_path(path) {
            ConfigFormat::Json => JsonBackend.read_int(path, section, key),
            ConfigFormat::KeyFile => KeyFileBackend.read_int(path, section, key),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn wrong_type(path: &Path, section: &str, key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        path: path.to_path_buf(),
        section: section.to_string(),
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("/etc/knot/gatewayConfig.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("cfg.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("/etc/knot/knotd.conf")), ConfigFormat::KeyFile);
        assert_eq!(ConfigFormat::from_path(Path::new("no_extension")), ConfigFormat::KeyFile);
    }

    #[test]
    fn test_auto_backend_dispatches_by_extension() {
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"cloud":{{"uuid":"from-json"}}}}"#).unwrap();

        let mut conf = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        write!(conf, "[Cloud]\nuuid=from-keyfile\n").unwrap();

        let backend = AutoBackend;
        assert_eq!(
            backend.read_string(json.path(), "cloud", "uuid").unwrap().as_deref(),
            Some("from-json")
        );
        assert_eq!(
            backend.read_string(conf.path(), "cloud", "uuid").unwrap().as_deref(),
            Some("from-keyfile")
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AutoBackend
            .read_string(Path::new("/nonexistent/knotd.json"), "cloud", "uuid")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
