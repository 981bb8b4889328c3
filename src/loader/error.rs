use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoaderError {
    #[error("config root '{0}' is not a readable directory")]
    RootInvalid(PathBuf),

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("config file type '{0}' is not supported")]
    UnsupportedFormat(String),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write config cache '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config cache: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("config file '{0}' does not contain a table")]
    NotATable(PathBuf),
}
