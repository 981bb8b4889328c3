//! Hierarchical configuration registries with lazy group loading,
//! `${...}` reference resolution and delegation across registries.

pub mod config;
pub mod delegator;
mod error;
pub mod loader;
mod traits;
pub mod tree;
pub mod value;

pub use config::{Config, ConfigBuilder, Trail};
pub use delegator::Delegator;
pub use error::{Error, ErrorMode};
pub use traits::{DelegatorAware, Lookup, Registry, Writable};
pub use tree::Tree;
pub use value::{Table, Value};
