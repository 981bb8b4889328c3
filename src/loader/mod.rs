//! Sources that hand raw grouped data to a registry.
//!
//! A [`Loader`] answers "give me group `g`" with a table of
//! `group name -> group data`. It may return more than the requested group;
//! the empty group name asks for everything the loader knows about.
//! Registries remember which groups they have loaded, so loaders do not need
//! to guard against repeated calls.

mod cached;
mod error;
mod file;
mod reader;

pub use cached::CachedLoader;
pub use error::LoaderError;
pub use file::FileLoader;
pub use reader::{reader_for, JsonReader, Reader, TomlReader};

use crate::value::{Table, Value};

pub trait Loader: Send + Sync + std::fmt::Debug {
    /// Loads `group` (or all groups when `group` is empty).
    ///
    /// `environment` overrides the loader's default environment for this
    /// call; `None` keeps the default.
    fn load(&self, group: &str, environment: Option<&str>) -> Result<Table, LoaderError>;
}

/// A loader with nothing to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoader;

impl Loader for NoopLoader {
    fn load(&self, _group: &str, _environment: Option<&str>) -> Result<Table, LoaderError> {
        Ok(Table::new())
    }
}

/// Merges `overlay` into `base`. Nested tables merge recursively; every
/// other value, arrays included, replaces what was there.
pub(crate) fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
