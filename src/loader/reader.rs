//! Single-format file parsers used by [`FileLoader`](super::FileLoader).

use std::path::Path;

use super::LoaderError;
use crate::value::{Table, Value};

/// Parses one config file format into a table.
pub trait Reader: Send + Sync + std::fmt::Debug {
    /// File extension handled by this reader, without the dot.
    fn extension(&self) -> &'static str;

    fn read(&self, path: &Path) -> Result<Table, LoaderError>;
}

/// Returns the reader for a file extension, if one is supported.
pub fn reader_for(extension: &str) -> Option<Box<dyn Reader>> {
    match extension.trim_start_matches('.') {
        "toml" => Some(Box::new(TomlReader)),
        "json" => Some(Box::new(JsonReader)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlReader;

impl Reader for TomlReader {
    fn extension(&self) -> &'static str {
        "toml"
    }

    fn read(&self, path: &Path) -> Result<Table, LoaderError> {
        let contents = read_file(path)?;
        let table: toml::Table = toml::from_str(&contents).map_err(|e| LoaderError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        match Value::from(toml::Value::Table(table)) {
            Value::Table(table) => Ok(table),
            _ => Err(LoaderError::NotATable(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl Reader for JsonReader {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn read(&self, path: &Path) -> Result<Table, LoaderError> {
        let contents = read_file(path)?;
        let json: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| LoaderError::JsonParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        match Value::from(json) {
            Value::Table(table) => Ok(table),
            _ => Err(LoaderError::NotATable(path.to_path_buf())),
        }
    }
}

fn read_file(path: &Path) -> Result<String, LoaderError> {
    tracing::trace!(path = %path.display(), "reading config file");
    std::fs::read_to_string(path).map_err(|e| LoaderError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}
