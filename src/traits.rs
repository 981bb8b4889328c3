//! Capability traits shared by [`Config`](crate::Config) and
//! [`Delegator`](crate::Delegator).
//!
//! A registry is anything that can be read ([`Lookup`]), written
//! ([`Writable`]) and attached to a delegator ([`DelegatorAware`]).
//! Delegators hold their members as `Arc<dyn Registry>`.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::Trail;
use crate::delegator::Delegator;
use crate::value::Value;
use crate::Error;

pub trait Lookup: Send + Sync + std::fmt::Debug {
    /// Resolves `key` as part of a larger resolution.
    ///
    /// Implementations push `key` onto `trail` while resolving its value and
    /// pop it afterwards. `Ok(None)` means the key is unset.
    fn lookup(&self, key: &str, trail: &mut Trail) -> Result<Option<Value>, Error>;

    /// Returns `true` if `key` holds a non-null value.
    ///
    /// Never fails and never logs, whatever the error mode. References are
    /// not resolved.
    fn has(&self, key: &str) -> bool;

    /// Returns the resolved value at `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.lookup(key, &mut Trail::new())
    }

    /// Returns the resolved value at `key`, or `default` when it is unset.
    fn get_or(&self, key: &str, default: Value) -> Result<Value, Error> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Deserializes the resolved value at `key`.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error>
    where
        Self: Sized,
    {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        let json = serde_json::to_value(value).map_err(|e| Error::Deserialize {
            key: key.to_string(),
            source: e,
        })?;
        serde_json::from_value(json)
            .map(Some)
            .map_err(|e| Error::Deserialize {
                key: key.to_string(),
                source: e,
            })
    }

    /// Capability tag used to walk delegation graphs.
    fn as_delegator(&self) -> Option<&Delegator> {
        None
    }
}

pub trait Writable {
    /// Stores `value` at `key` without resolving references, returning
    /// whether the key holds a non-null value afterwards. Storing
    /// [`Value::Null`] unsets the key and returns `false`.
    ///
    /// Fails with [`Error::NotWritable`] on a read-only registry.
    fn set(&self, key: &str, value: Value) -> Result<bool, Error>;

    /// Removes the node at `key`, returning whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool, Error>;

    fn is_writable(&self) -> bool;

    fn set_writable(&self, writable: bool);

    /// Sends every later write to `writer` instead.
    fn set_writer(&self, writer: Arc<dyn Registry>);
}

pub trait DelegatorAware {
    /// Records `delegator` as the one to resolve references through.
    ///
    /// Only a weak back-reference is kept. Use [`Delegator::attach`] to
    /// register and link in one step.
    fn set_delegator(&self, delegator: &Arc<Delegator>);

    fn delegator(&self) -> Option<Arc<Delegator>>;

    fn has_delegator(&self) -> bool {
        self.delegator().is_some()
    }
}

pub trait Registry: Lookup + Writable + DelegatorAware {}

impl<T: Lookup + Writable + DelegatorAware + ?Sized> Registry for T {}
