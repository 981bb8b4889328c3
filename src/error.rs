use thiserror::Error;

use crate::loader::LoaderError;

/// Top-level error type for the dragon-registry library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to load config group: {0}")]
    GroupLoad(#[from] LoaderError),

    #[error("config reference \"{0}\" unknown")]
    UnknownReference(String),

    #[error("circular reference detected at \"{0}\"")]
    CircularReference(String),

    #[error("cannot splice non-scalar value of \"{0}\" into a string")]
    NonScalarReference(String),

    #[error("unknown global \"{0}\"")]
    UnknownGlobal(String),

    #[error("config is not writable")]
    NotWritable,

    #[error("config key \"{0}\" is not valid")]
    InvalidKey(String),

    #[error("registry would create a delegation cycle")]
    DelegationCycle,

    #[error("failed to deserialize \"{key}\": {source}")]
    Deserialize {
        key: String,
        source: serde_json::Error,
    },
}

/// How a registry reacts to policy-governed errors on read.
///
/// Write errors ([`Error::NotWritable`], [`Error::InvalidKey`] on `set`) are
/// always returned, whatever the mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Swallow the error; the caller sees the default.
    Ignore,
    /// Emit a `tracing` warning and carry on as with `Ignore`.
    #[default]
    Warn,
    /// Return the error to the caller.
    Raise,
}

impl ErrorMode {
    /// Applies the policy to `err` raised while handling `key`: either hands
    /// it back or swallows it.
    pub(crate) fn handle(self, err: Error, key: &str) -> Result<(), Error> {
        match self {
            ErrorMode::Ignore => Ok(()),
            ErrorMode::Warn => {
                tracing::warn!(error = %err, key, "config error suppressed");
                Ok(())
            }
            ErrorMode::Raise => Err(err),
        }
    }
}
