//! Loader backed by a pre-serialized snapshot of every group.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Loader, LoaderError};
use crate::value::{Table, Value};

/// Reads a JSON snapshot of all groups on the first `load` and returns
/// nothing afterwards.
///
/// A registry marks every group it receives as loaded, so handing over the
/// whole snapshot once is enough. Snapshots are produced by
/// [`CachedLoader::store`], typically from `config.get("")`.
#[derive(Debug)]
pub struct CachedLoader {
    cache_file: PathBuf,
    loaded: AtomicBool,
}

impl CachedLoader {
    pub fn new(cache_file: impl AsRef<Path>) -> Self {
        Self {
            cache_file: cache_file.as_ref().to_path_buf(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Writes `groups` as a snapshot readable by a `CachedLoader`.
    pub fn store(cache_file: impl AsRef<Path>, groups: &Table) -> Result<(), LoaderError> {
        let path = cache_file.as_ref();
        let json = serde_json::to_string_pretty(groups).map_err(LoaderError::Serialize)?;
        std::fs::write(path, json).map_err(|e| LoaderError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Loader for CachedLoader {
    fn load(&self, _group: &str, _environment: Option<&str>) -> Result<Table, LoaderError> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return Ok(Table::new());
        }

        let contents =
            std::fs::read_to_string(&self.cache_file).map_err(|e| LoaderError::ReadError {
                path: self.cache_file.clone(),
                source: e,
            })?;
        let json: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| LoaderError::JsonParse {
                path: self.cache_file.clone(),
                source: e,
            })?;

        match Value::from(json) {
            Value::Table(groups) => Ok(groups),
            _ => Err(LoaderError::NotATable(self.cache_file.clone())),
        }
    }
}
