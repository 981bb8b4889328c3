use std::collections::HashSet;
use std::sync::Weak;

use parking_lot::{Mutex, RwLock};

use super::{Config, Writer};
use crate::loader::{Loader, NoopLoader};
use crate::tree::{Tree, DEFAULT_DELIMITER};
use crate::value::Table;
use crate::ErrorMode;

/// Builder for a [`Config`] registry.
///
/// ## Example
///
/// ```no_run
/// use dragon_registry::loader::FileLoader;
/// use dragon_registry::{Config, ErrorMode};
///
/// let config = Config::builder()
///     .with_loader(FileLoader::new("config", "production", "toml")?)
///     .with_error_mode(ErrorMode::Raise)
///     .writable(true)
///     .build();
/// # Ok::<(), dragon_registry::loader::LoaderError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigBuilder {
    loader: Option<Box<dyn Loader>>,
    data: Table,
    globals: Table,
    environment: Option<String>,
    delimiter: Option<String>,
    error_mode: ErrorMode,
    writable: bool,
}

impl ConfigBuilder {
    /// Sets the loader that supplies groups on first access.
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Seeds the registry with in-memory groups.
    ///
    /// Each top-level key counts as an already loaded group, so the loader
    /// is never asked for it.
    pub fn with_data(mut self, data: Table) -> Self {
        self.data = data;
        self
    }

    /// Read-only values served for groups starting with `_`, such as `_ENV`.
    pub fn with_globals(mut self, globals: Table) -> Self {
        self.globals = globals;
        self
    }

    /// Environment passed to every loader call, e.g. `production/host1`.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the path separator. Defaults to `.`.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "delimiter must not be empty");
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Allows `set` and `delete`. Registries are read-only by default.
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn build(self) -> Config {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());
        let loaded: HashSet<String> = self.data.keys().cloned().collect();

        Config {
            tree: RwLock::new(Tree::from_table(self.data, delimiter)),
            loader: Mutex::new(self.loader.unwrap_or_else(|| Box::new(NoopLoader))),
            loaded: Mutex::new(loaded),
            globals: self.globals,
            environment: self.environment,
            error_mode: RwLock::new(self.error_mode),
            writer: RwLock::new(if self.writable {
                Writer::Local
            } else {
                Writer::ReadOnly
            }),
            delegator: RwLock::new(Weak::new()),
        }
    }
}
