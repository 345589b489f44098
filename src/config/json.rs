//! JSON document reader.

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::backend::{read_file, wrong_type, ConfigBackend, ConfigError};

/// Reads `{"<section>": {"<key>": value}}` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl JsonBackend {
    fn lookup(&self, path: &Path, section: &str, key: &str) -> Result<Option<Value>, ConfigError> {
        let content = read_file(path)?;
        let document: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(table) = document.as_object().and_then(|root| find_section(root, section)) else {
            return Ok(None);
        };
        Ok(table.get(key).filter(|value| !value.is_null()).cloned())
    }
}

fn find_section<'a>(root: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    root.iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_object())
}

impl ConfigBackend for JsonBackend {
    fn read_string(
        &self,
        path: &Path,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        match self.lookup(path, section, key)? {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(_) => Err(wrong_type(path, section, key, "a string")),
        }
    }

    fn read_int(&self, path: &Path, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.lookup(path, section, key)? {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| wrong_type(path, section, key, "an integer")),
            Some(Value::String(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| wrong_type(path, section, key, "an integer")),
            Some(_) => Err(wrong_type(path, section, key, "an integer")),
        }
    }
}
