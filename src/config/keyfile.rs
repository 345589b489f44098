//! Section/key file reader.
//!
//! Files are INI-style key files with one group per section. Values are
//! bare text; surrounding quotes are stripped:
//!
//! ```text
//! [Cloud]
//! uuid=c7f1a2d0-0000-4000-8000-000000000001
//! serverName=cloud.example.com
//! port=8080
//! ```

use std::path::Path;

use ini::Ini;

use crate::config::backend::{read_file, wrong_type, ConfigBackend, ConfigError};

/// Reads `[Section]` / `key=value` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyFileBackend;

impl KeyFileBackend {
    fn lookup(&self, path: &Path, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let content = read_file(path)?;
        let document = Ini::load_from_str(&content).map_err(|source| ConfigError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;

        let value = document
            .iter()
            .find(|(name, _)| name.is_some_and(|name| name.eq_ignore_ascii_case(section)))
            .and_then(|(_, properties)| properties.get(key))
            .map(str::to_string);
        Ok(value)
    }
}

impl ConfigBackend for KeyFileBackend {
    fn read_string(
        &self,
        path: &Path,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        self.lookup(path, section, key)
    }

    fn read_int(&self, path: &Path, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.lookup(path, section, key)? {
            None => Ok(None),
            Some(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| wrong_type(path, section, key, "an integer")),
        }
    }
}
