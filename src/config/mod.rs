//! The lazily loaded configuration registry.

mod builder;
mod resolve;

pub use builder::ConfigBuilder;
pub use resolve::{Trail, MAX_DEPTH};

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::delegator::Delegator;
use crate::loader::Loader;
use crate::traits::{DelegatorAware, Lookup, Registry, Writable};
use crate::tree::Tree;
use crate::value::{Table, Value};
use crate::{Error, ErrorMode};

/// Groups starting with this character come from the injected globals
/// instead of the loader.
pub const GLOBAL_PREFIX: char = '_';

/// Loaded-set entry meaning "the loader has handed over every group".
const ALL_GROUPS: &str = "";

#[derive(Debug, Clone, Default)]
enum Writer {
    #[default]
    ReadOnly,
    Local,
    Sink(Arc<dyn Registry>),
}

/// A configuration registry backed by a [`Tree`] and a [`Loader`].
///
/// Keys are delimited paths such as `db.auth.host`. The first segment is the
/// key's *group*; the first access to a group asks the loader for it, and
/// each group is loaded at most once. The empty key `""` loads every group
/// and returns the whole tree.
///
/// Values are returned with `${path}` references resolved. When the registry
/// is attached to a [`Delegator`], references resolve through the delegator
/// chain instead of this registry alone.
///
/// ## Example
///
/// ```no_run
/// use dragon_registry::loader::FileLoader;
/// use dragon_registry::{Config, ErrorMode, Lookup};
///
/// let config = Config::builder()
///     .with_loader(FileLoader::new("config", "production/host1", "toml")?)
///     .with_error_mode(ErrorMode::Raise)
///     .build();
///
/// let host = config.get("db.auth.host")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Config {
    tree: RwLock<Tree>,
    loader: Mutex<Box<dyn Loader>>,
    loaded: Mutex<HashSet<String>>,
    globals: Table,
    environment: Option<String>,
    error_mode: RwLock<ErrorMode>,
    writer: RwLock<Writer>,
    delegator: RwLock<Weak<Delegator>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates an empty, read-only registry with nothing to load.
    pub fn new() -> Self {
        ConfigBuilder::default().build()
    }

    /// Creates a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn error_mode(&self) -> ErrorMode {
        *self.error_mode.read()
    }

    pub fn set_error_mode(&self, mode: ErrorMode) {
        *self.error_mode.write() = mode;
    }

    /// Replaces the loader. Groups already loaded stay loaded.
    pub fn set_loader(&self, loader: impl Loader + 'static) {
        *self.loader.lock() = Box::new(loader);
    }

    pub fn delimiter(&self) -> String {
        self.tree.read().delimiter().to_string()
    }

    /// Returns `true` once `group` has been handed to this registry.
    pub fn is_loaded(&self, group: &str) -> bool {
        let loaded = self.loaded.lock();
        if group.starts_with(GLOBAL_PREFIX) {
            return loaded.contains(group);
        }
        loaded.contains(ALL_GROUPS) || loaded.contains(group)
    }

    /// Loads the group of `key` unless it is already loaded.
    ///
    /// The group is marked loaded before the loader runs, so a failing
    /// group is not retried.
    fn ensure_loaded(&self, key: &str) -> Result<(), Error> {
        let group = {
            let tree = self.tree.read();
            tree.split(key)?;
            tree.first_segment(key).to_string()
        };

        let mut loaded = self.loaded.lock();

        // Globals never come from the loader, so loading everything does
        // not cover them.
        if group.starts_with(GLOBAL_PREFIX) {
            if loaded.contains(&group) {
                return Ok(());
            }
            loaded.insert(group.clone());
            return self.load_global(&group);
        }

        if loaded.contains(ALL_GROUPS) || loaded.contains(&group) {
            return Ok(());
        }
        loaded.insert(group.clone());

        let groups = self
            .loader
            .lock()
            .load(&group, self.environment.as_deref())?;
        debug!(group = %group, groups = groups.len(), "loaded config group");

        // A bad group name is reported once every valid group is stored.
        let mut first_err = None;
        let mut tree = self.tree.write();
        for (name, data) in groups {
            // Never clobber a group that was loaded or written earlier.
            if name != group && loaded.contains(&name) {
                continue;
            }
            match tree.add_node(&name, data) {
                Ok(()) => {
                    loaded.insert(name);
                }
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn load_global(&self, group: &str) -> Result<(), Error> {
        let value = self
            .globals
            .get(group)
            .cloned()
            .ok_or_else(|| Error::UnknownGlobal(group.to_string()))?;
        self.tree.write().add_node(group, value)
    }

    /// Returns the raw node at `key`, loading its group first.
    fn fetch(&self, key: &str, mode: ErrorMode) -> Result<Option<Value>, Error> {
        if let Err(err) = self.ensure_loaded(key) {
            mode.handle(err, key)?;
        }
        Ok(self.tree.read().get_node(key).cloned())
    }

    /// Loads the group of `key` before a write. Invalid keys always fail;
    /// load errors go through the error mode.
    fn load_for_write(&self, key: &str) -> Result<(), Error> {
        self.tree.read().split(key)?;
        match self.ensure_loaded(key) {
            Ok(()) => Ok(()),
            Err(err) => self.error_mode().handle(err, key),
        }
    }

    /// Resolves a referenced key, through the delegator chain if attached.
    fn reference_lookup(&self, name: &str, trail: &mut Trail) -> Result<Option<Value>, Error> {
        match self.delegator() {
            Some(delegator) => delegator.delegated_lookup(name, trail),
            None => self.lookup(name, trail),
        }
    }
}

impl Lookup for Config {
    fn lookup(&self, key: &str, trail: &mut Trail) -> Result<Option<Value>, Error> {
        let mode = self.error_mode();
        let Some(mut value) = self.fetch(key, mode)? else {
            return Ok(None);
        };

        trail.push(key);
        let result = resolve::resolve_value(
            &mut value,
            mode,
            trail,
            &mut |name: &str, trail: &mut Trail| self.reference_lookup(name, trail),
        );
        trail.pop();
        result?;

        Ok((!value.is_null()).then_some(value))
    }

    fn has(&self, key: &str) -> bool {
        // Load errors are dropped here: presence checks never raise or warn.
        let _ = self.ensure_loaded(key);
        self.tree
            .read()
            .get_node(key)
            .is_some_and(|value| !value.is_null())
    }
}

impl Writable for Config {
    fn set(&self, key: &str, value: Value) -> Result<bool, Error> {
        let writer = self.writer.read().clone();
        match writer {
            Writer::ReadOnly => Err(Error::NotWritable),
            Writer::Sink(sink) => sink.set(key, value),
            Writer::Local => {
                // Load first so a later lazy load cannot overwrite this write.
                self.load_for_write(key)?;
                let mut tree = self.tree.write();
                tree.add_node(key, value)?;
                Ok(tree.get_node(key).is_some_and(|value| !value.is_null()))
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool, Error> {
        let writer = self.writer.read().clone();
        match writer {
            Writer::ReadOnly => Err(Error::NotWritable),
            Writer::Sink(sink) => sink.delete(key),
            Writer::Local => {
                // Load first so a later lazy load cannot bring the key back.
                self.load_for_write(key)?;
                Ok(self.tree.write().delete_node(key))
            }
        }
    }

    fn is_writable(&self) -> bool {
        !matches!(*self.writer.read(), Writer::ReadOnly)
    }

    fn set_writable(&self, writable: bool) {
        *self.writer.write() = if writable {
            Writer::Local
        } else {
            Writer::ReadOnly
        };
    }

    fn set_writer(&self, writer: Arc<dyn Registry>) {
        *self.writer.write() = Writer::Sink(writer);
    }
}

impl DelegatorAware for Config {
    fn set_delegator(&self, delegator: &Arc<Delegator>) {
        *self.delegator.write() = Arc::downgrade(delegator);
    }

    fn delegator(&self) -> Option<Arc<Delegator>> {
        self.delegator.read().upgrade()
    }
}
