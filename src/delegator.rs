//! Ordered composition of registries.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::config::Trail;
use crate::traits::{DelegatorAware, Lookup, Registry, Writable};
use crate::value::Value;
use crate::Error;

#[derive(Debug, Clone, Default)]
enum DelegateWriter {
    #[default]
    None,
    /// The first writable member, found by the last `is_writable` scan.
    Member(Arc<dyn Registry>),
    /// A writer assigned with `set_writer`; takes precedence over members.
    Sink(Arc<dyn Registry>),
}

/// Presents several registries as one.
///
/// Reads go to the first member that has the key. Writes go to the first
/// writable member, or to an explicitly assigned writer. A delegator can be
/// a member of another delegator.
///
/// Registries attached with [`Delegator::attach`] resolve their `${...}`
/// references through the delegator, so one registry can refer to values
/// held by its siblings. When the delegator is itself attached to a parent,
/// references resolve through the outermost delegator.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use dragon_registry::{Config, Delegator, Lookup, Value};
///
/// let defaults = Arc::new(Config::builder()
///     .with_data(serde_json::from_str(r#"{"db": {"host": "localhost"}}"#).unwrap())
///     .build());
/// let app = Arc::new(Config::builder()
///     .with_data(serde_json::from_str(r#"{"app": {"dsn": "${db.host}:5432"}}"#).unwrap())
///     .build());
///
/// let delegator = Arc::new(Delegator::new());
/// delegator.attach(app)?;
/// delegator.attach(defaults)?;
///
/// assert_eq!(delegator.get("app.dsn")?, Some(Value::from("localhost:5432")));
/// # Ok::<(), dragon_registry::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Delegator {
    members: RwLock<Vec<Arc<dyn Registry>>>,
    writer: RwLock<DelegateWriter>,
    parent: RwLock<Weak<Delegator>>,
}

impl Delegator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a member. Earlier members take precedence on reads.
    ///
    /// Fails with [`Error::DelegationCycle`] if `registry` is this delegator
    /// or already contains it.
    pub fn add_registry(&self, registry: Arc<dyn Registry>) -> Result<(), Error> {
        if let Some(delegator) = registry.as_delegator() {
            if std::ptr::eq(delegator, self) || delegator.reaches(self) {
                return Err(Error::DelegationCycle);
            }
        }
        self.members.write().push(registry);
        Ok(())
    }

    /// Appends `registry` and makes it resolve references through `self`.
    pub fn attach(self: &Arc<Self>, registry: Arc<dyn Registry>) -> Result<(), Error> {
        self.add_registry(registry.clone())?;
        registry.set_delegator(self);
        Ok(())
    }

    /// A snapshot of the members, in lookup order.
    pub fn members(&self) -> Vec<Arc<dyn Registry>> {
        self.members.read().clone()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Resolves `key` through the outermost delegator of the chain.
    pub fn delegated_lookup(&self, key: &str, trail: &mut Trail) -> Result<Option<Value>, Error> {
        let mut seen: Vec<*const Delegator> = vec![self as *const Delegator];
        let mut top: Option<Arc<Delegator>> = None;
        let mut next = self.delegator();

        while let Some(parent) = next {
            let ptr = Arc::as_ptr(&parent);
            if seen.contains(&ptr) {
                break;
            }
            seen.push(ptr);
            next = parent.delegator();
            top = Some(parent);
        }

        match top {
            Some(top) => top.lookup(key, trail),
            None => self.lookup(key, trail),
        }
    }

    /// Returns `true` if `target` is a member of this delegator or of any
    /// delegator nested in it.
    fn reaches(&self, target: &Delegator) -> bool {
        self.members().iter().any(|member| {
            member
                .as_delegator()
                .is_some_and(|d| std::ptr::eq(d, target) || d.reaches(target))
        })
    }

    fn current_writer(&self) -> Option<Arc<dyn Registry>> {
        if !self.is_writable() {
            return None;
        }
        match &*self.writer.read() {
            DelegateWriter::Member(writer) | DelegateWriter::Sink(writer) => Some(writer.clone()),
            DelegateWriter::None => None,
        }
    }
}

impl Lookup for Delegator {
    fn lookup(&self, key: &str, trail: &mut Trail) -> Result<Option<Value>, Error> {
        for member in self.members() {
            if member.has(key) {
                return member.lookup(key, trail);
            }
        }
        Ok(None)
    }

    fn has(&self, key: &str) -> bool {
        self.members().iter().any(|member| member.has(key))
    }

    fn as_delegator(&self) -> Option<&Delegator> {
        Some(self)
    }
}

impl Writable for Delegator {
    fn set(&self, key: &str, value: Value) -> Result<bool, Error> {
        self.current_writer()
            .ok_or(Error::NotWritable)?
            .set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, Error> {
        self.current_writer()
            .ok_or(Error::NotWritable)?
            .delete(key)
    }

    /// Rescans the members on every call, so changes to member writability
    /// are always picked up.
    fn is_writable(&self) -> bool {
        let mut writer = self.writer.write();
        if matches!(*writer, DelegateWriter::Sink(_)) {
            return true;
        }

        *writer = self
            .members()
            .into_iter()
            .find(|member| member.is_writable())
            .map_or(DelegateWriter::None, DelegateWriter::Member);
        !matches!(*writer, DelegateWriter::None)
    }

    /// `true` makes the first member writable unless some member already
    /// is; `false` drops any assigned writer and makes every member
    /// read-only.
    fn set_writable(&self, writable: bool) {
        if writable {
            if !self.is_writable() {
                if let Some(first) = self.members().first() {
                    first.set_writable(true);
                }
            }
        } else {
            *self.writer.write() = DelegateWriter::None;
            for member in self.members() {
                member.set_writable(false);
            }
        }
    }

    fn set_writer(&self, writer: Arc<dyn Registry>) {
        *self.writer.write() = DelegateWriter::Sink(writer);
    }
}

impl DelegatorAware for Delegator {
    fn set_delegator(&self, delegator: &Arc<Delegator>) {
        *self.parent.write() = Arc::downgrade(delegator);
    }

    fn delegator(&self) -> Option<Arc<Delegator>> {
        self.parent.read().upgrade()
    }
}
